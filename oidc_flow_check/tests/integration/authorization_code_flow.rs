use std::collections::HashSet;

use oidc_flow_check::{FlowPlan, FlowStep, assert_html, assert_ok, run_authorization_code_flow};
use oidc_flow_site::OidcClientOptions;

use crate::common::{RESOURCE_NAME, SiteFixture, TestResult, new_client_id};

/// resource → authorize → login → authorize → callback → resource
#[tokio::test]
async fn test_authorization_code_flow_completes() -> TestResult {
    let fixture = SiteFixture::code_flow().await?;
    let mut driver = fixture.driver()?;

    let outcome = run_authorization_code_flow(&mut driver, &fixture.flow, &FlowPlan::new()).await?;

    assert_eq!(outcome.hops.len(), 6);
    assert_eq!(
        outcome.hops.iter().map(|h| h.status).collect::<Vec<_>>(),
        vec![302, 302, 302, 302, 302, 200]
    );
    assert!(outcome.code.as_deref().is_some_and(|c| !c.is_empty()));
    assert!(!outcome.state.is_empty());

    assert!(outcome.cookies.iter().any(|c| c == ".AspNetCore.Cookies"));
    assert!(outcome.cookies.iter().any(|c| c == ".AspNetCore.Identity.Application"));
    assert!(
        outcome
            .cookies
            .iter()
            .any(|c| c == "Microsoft.AspNetCore.Applications.Authentication.Cookie")
    );
    assert!(
        !outcome
            .cookies
            .iter()
            .any(|c| c.starts_with(".AspNetCore.Correlation.") || c.starts_with(".AspNetCore.OpenIdConnect.Nonce."))
    );
    Ok(())
}

/// The state echoed on the callback equals the state sent to authorize,
/// and no two challenges share one
#[tokio::test]
async fn test_state_round_trips_for_many_clients() -> TestResult {
    let mut states = HashSet::new();

    for _ in 0..5 {
        let fixture = SiteFixture::code_flow().await?;
        let mut driver = fixture.driver()?;
        let outcome =
            run_authorization_code_flow(&mut driver, &fixture.flow, &FlowPlan::new()).await?;

        assert!(states.insert(outcome.state));
        fixture.site.shutdown();
    }
    assert_eq!(states.len(), 5);
    Ok(())
}

#[tokio::test]
async fn test_credentials_login() -> TestResult {
    let client_id = new_client_id();
    let fixture =
        SiteFixture::start(&client_id, OidcClientOptions::new(&client_id).code_flow(), false)
            .await?;
    let mut driver = fixture.driver()?;
    let plan = FlowPlan::new().with_credentials("bob", "bob-pw");

    let outcome = run_authorization_code_flow(&mut driver, &fixture.flow, &plan).await?;

    // The login page and the credential POST are separate hops
    assert_eq!(outcome.hops.len(), 7);
    assert_eq!(outcome.hops[2].status, 200);
    assert_eq!(outcome.hops[3].method, "POST");

    let page = driver.get("/Home/About").await?;
    assert_signed_in_as(&page, "bob")?;
    Ok(())
}

#[tokio::test]
async fn test_user_hint_picks_signed_in_user() -> TestResult {
    let fixture = SiteFixture::code_flow().await?;
    let flow = fixture.flow.clone().with_user_hint("bob");
    let mut driver = oidc_flow_check::FlowDriver::from_config(&flow)?;

    run_authorization_code_flow(&mut driver, &flow, &FlowPlan::new()).await?;

    let page = driver.get("/Home/About").await?;
    assert_signed_in_as(&page, "bob")?;
    Ok(())
}

#[tokio::test]
async fn test_default_user_without_hint() -> TestResult {
    let fixture = SiteFixture::code_flow().await?;
    let mut driver = fixture.driver()?;

    run_authorization_code_flow(&mut driver, &fixture.flow, &FlowPlan::new()).await?;

    let page = driver.get("/Home/About").await?;
    assert_signed_in_as(&page, "alice")?;
    Ok(())
}

#[tokio::test]
async fn test_flow_with_resource_scope() -> TestResult {
    let client_id = new_client_id();
    let options = OidcClientOptions::new(&client_id)
        .code_flow()
        .with_resource_scope(RESOURCE_NAME, "read");
    let fixture = SiteFixture::start(&client_id, options, true).await?;
    let mut driver = fixture.driver()?;

    let outcome = run_authorization_code_flow(&mut driver, &fixture.flow, &FlowPlan::new()).await?;

    let authorize = outcome.hops[1].url.clone();
    assert!(authorize.contains("Identity%2Fv2.0%2FOrders%2Fread"));
    Ok(())
}

fn assert_signed_in_as(page: &FlowStep, user: &str) -> TestResult {
    assert_ok(page)?;
    let document = assert_html(page)?;
    assert_eq!(document.title().as_deref(), Some("About"));
    assert!(
        document.body.contains(&format!("<span id=\"user\">{user}</span>")),
        "expected {user} in {}",
        document.body
    );
    Ok(())
}
