use oidc_flow_check::{
    FlowPlan, assert_has_cookie_named, assert_has_form, assert_html, assert_ok, run_id_token_flow,
};
use oidc_flow_site::OidcClientOptions;

use crate::common::{SiteFixture, TestResult, new_client_id};

/// resource → authorize → login → authorize(form_post) → callback → resource
#[tokio::test]
async fn test_id_token_flow_completes() -> TestResult {
    let fixture = SiteFixture::id_token_flow().await?;
    let mut driver = fixture.driver()?;

    let outcome = run_id_token_flow(&mut driver, &fixture.flow, &FlowPlan::new()).await?;

    assert_eq!(outcome.hops.len(), 6);
    assert_eq!(outcome.hops[3].status, 200);
    assert_eq!(outcome.hops[4].method, "POST");
    assert!(outcome.hops[4].url.ends_with("/signin-oidc"));
    assert!(outcome.code.is_none());
    assert!(outcome.cookies.iter().any(|c| c == ".AspNetCore.Cookies"));
    Ok(())
}

#[tokio::test]
async fn test_authorize_renders_single_auto_submit_form() -> TestResult {
    let fixture = SiteFixture::id_token_flow().await?;
    let mut driver = fixture.driver()?;

    let challenge = driver.get("/Home/About").await?;
    let to_login = driver.follow(&challenge).await?;
    let signed_in = driver.follow(&to_login).await?;
    let authorized = driver.follow(&signed_in).await?;

    assert_eq!(authorized.hop, 4);
    assert_ok(&authorized)?;
    assert_has_cookie_named("Microsoft.AspNetCore.Applications.Authentication.Cookie", &authorized)?;

    let document = assert_html(&authorized)?;
    assert!(document.is_auto_submitting());
    assert_eq!(document.forms()?.len(), 1);

    let form = assert_has_form(&document, "form")?;
    assert_eq!(form.field_names(), vec!["id_token", "state"]);
    assert_eq!(form.action.path(), "/signin-oidc");
    assert_eq!(
        form.get("id_token").map(|t| t.split('.').count()),
        Some(3),
        "id_token is a compact JWS"
    );
    Ok(())
}

#[tokio::test]
async fn test_id_token_flow_with_credentials() -> TestResult {
    let client_id = new_client_id();
    let fixture = SiteFixture::start(&client_id, OidcClientOptions::new(&client_id), false).await?;
    let mut driver = fixture.driver()?;
    let plan = FlowPlan::new().with_credentials("alice", "alice-pw");

    let outcome = run_id_token_flow(&mut driver, &fixture.flow, &plan).await?;

    assert_eq!(outcome.hops.len(), 7);
    Ok(())
}

/// A second resource request after sign-in is served without a challenge
#[tokio::test]
async fn test_session_survives_flow() -> TestResult {
    let fixture = SiteFixture::id_token_flow().await?;
    let mut driver = fixture.driver()?;
    run_id_token_flow(&mut driver, &fixture.flow, &FlowPlan::new()).await?;

    let again = driver.get("/Home/About").await?;
    assert_ok(&again)?;
    assert!(again.set_cookies.is_empty());
    Ok(())
}
