use chrono::Duration;
use oidc_flow_check::{
    ComparisonCriteria, CookieField, ExpectedCookie, FlowError, FlowPlan, Form, FormMethod,
    assert_has_cookie, assert_has_form, assert_html, assert_location_has_query_params, assert_ok,
    assert_redirect, run_authorization_code_flow, run_id_token_flow,
};
use oidc_flow_site::{OidcClientOptions, ResponseMode};

use crate::common::{RESOURCE_NAME, SiteFixture, TestResult, new_client_id};

const AUTHORIZE_PATH: &str = "/tfp/Identity/signinsignup/oauth2/v2.0/authorize";
const LOGIN_PATH: &str = "/tfp/Identity/signinsignup/Account/Login";
const TOKEN_PATH: &str = "/tfp/Identity/signinsignup/oauth2/v2.0/token";

#[tokio::test]
async fn test_unauthenticated_request_challenges_with_cookies() -> TestResult {
    let fixture = SiteFixture::code_flow().await?;
    let mut driver = fixture.driver()?;

    let challenge = driver.get("/Home/About").await?;

    assert_eq!(challenge.status.as_u16(), 302);
    let location = assert_redirect(&challenge)?;
    assert_eq!(location.path(), AUTHORIZE_PATH);

    let params = assert_location_has_query_params(
        &challenge,
        &["client_id", "redirect_uri", "response_type", "scope", "state", "nonce"],
    )?;
    assert_eq!(params["client_id"], fixture.client_id);
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["redirect_uri"], fixture.site.url("/signin-oidc"));

    let criteria = ComparisonCriteria::STRICT & !ComparisonCriteria::NAME_EQUALS
        | ComparisonCriteria::NAME_STARTS_WITH;
    for prefix in [".AspNetCore.Correlation.OpenIdConnect.", ".AspNetCore.OpenIdConnect.Nonce."] {
        let expected = ExpectedCookie::new(prefix, "N")
            .with_path("/")
            .secure()
            .http_only()
            .expires_in(Duration::minutes(15));
        let cookie = assert_has_cookie(&expected, &challenge, criteria)?;
        assert_eq!(cookie.same_site.as_deref(), Some("None"));
    }

    // The nonce cookie is named after the nonce sent to authorize
    assert!(
        challenge
            .set_cookie(&format!(".AspNetCore.OpenIdConnect.Nonce.{}", params["nonce"]))
            .is_some()
    );
    Ok(())
}

#[tokio::test]
async fn test_authorize_without_login_redirects_to_login() -> TestResult {
    let fixture = SiteFixture::code_flow().await?;
    let mut driver = fixture.driver()?;

    let challenge = driver.get("/Home/About").await?;
    let unauthenticated = driver.follow(&challenge).await?;

    let params = assert_location_has_query_params(&unauthenticated, &["returnUrl"])?;
    let location = assert_redirect(&unauthenticated)?;
    assert_eq!(location.path(), LOGIN_PATH);
    assert!(params["returnUrl"].starts_with(AUTHORIZE_PATH));
    assert!(unauthenticated.set_cookies.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_wrong_cookie_expectation_names_the_field() -> TestResult {
    let fixture = SiteFixture::code_flow().await?;
    let mut driver = fixture.driver()?;
    let challenge = driver.get("/Home/About").await?;

    let expected = ExpectedCookie::new(".AspNetCore.Correlation.OpenIdConnect.", "Y");
    let criteria = ComparisonCriteria::NAME_STARTS_WITH | ComparisonCriteria::VALUE;
    let err = assert_has_cookie(&expected, &challenge, criteria).unwrap_err();

    match err {
        FlowError::CookieMismatch { hop, report, .. } => {
            assert_eq!(hop, 1);
            let mismatch = report.field(CookieField::Value).expect("value mismatch");
            assert_eq!(mismatch.actual, "'N'");
        }
        other => panic!("expected CookieMismatch, got {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_replayed_code_is_rejected() -> TestResult {
    let fixture = SiteFixture::code_flow().await?;
    let mut driver = fixture.driver()?;
    let outcome = run_authorization_code_flow(&mut driver, &fixture.flow, &FlowPlan::new()).await?;
    let code = outcome.code.expect("code flow yields a code");

    let replay = Form {
        id: None,
        action: driver.resolve(TOKEN_PATH)?,
        method: FormMethod::Post,
        fields: vec![
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("code".to_string(), code),
            ("client_id".to_string(), fixture.client_id.clone()),
            ("redirect_uri".to_string(), fixture.site.url("/signin-oidc")),
        ],
    };
    let step = driver.send_form(&replay).await?;

    let err = assert_ok(&step).unwrap_err();
    assert!(matches!(
        err,
        FlowError::UnexpectedStatus { actual: 400, hop: 7, .. }
    ));
    Ok(())
}

/// Replaying the callback the identity provider issued with its code swapped
/// is refused without a redirect, so the flow fails at that hop
#[tokio::test]
async fn test_callback_with_invalid_code_fails() -> TestResult {
    let fixture = SiteFixture::code_flow().await?;
    let mut driver = fixture.driver()?;

    let challenge = driver.get("/Home/About").await?;
    let unauthenticated = driver.follow(&challenge).await?;
    let signed_in = driver.follow(&unauthenticated).await?;
    let authorized = driver.follow(&signed_in).await?;
    assert_eq!(authorized.hop, 4);

    let params = assert_location_has_query_params(&authorized, &["code", "state"])?;
    let mut callback = assert_redirect(&authorized)?;
    assert_eq!(callback.path(), "/signin-oidc");
    callback
        .query_pairs_mut()
        .clear()
        .append_pair("code", &format!("{}-tampered", params["code"]))
        .append_pair("state", &params["state"]);
    let step = driver.get(callback.as_str()).await?;

    let err = assert_redirect(&step).unwrap_err();
    assert!(matches!(
        err,
        FlowError::UnexpectedStatus { hop: 5, actual: 400, .. }
    ));
    // Correlation and nonce cookies survive a failed callback
    assert!(step.set_cookies.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_wrong_credentials_never_redirect() -> TestResult {
    let client_id = new_client_id();
    let fixture =
        SiteFixture::start(&client_id, OidcClientOptions::new(&client_id).code_flow(), false)
            .await?;
    let mut driver = fixture.driver()?;
    let plan = FlowPlan::new().with_credentials("alice", "not-her-password");

    let err = run_authorization_code_flow(&mut driver, &fixture.flow, &plan)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FlowError::UnexpectedStatus { hop: 4, actual: 200, .. }
    ));
    assert!(driver.jar().get(".AspNetCore.Identity.Application").is_none());
    Ok(())
}

#[tokio::test]
async fn test_removed_redirect_uri_fails_at_authorize() -> TestResult {
    let fixture = SiteFixture::code_flow().await?;
    let callback = fixture.site.url("/signin-oidc");
    let application = format!("/Identity/Applications/{}", fixture.client_id);

    let mut admin = fixture.driver()?;
    let to_login = admin.get(&application).await?;
    let signed_in = admin.follow(&to_login).await?;
    let page = admin.follow(&signed_in).await?;
    assert_ok(&page)?;
    assert!(assert_html(&page)?.body.contains(&callback));

    let mut remove = admin.resolve(&format!("{application}/RedirectUris/Remove"))?;
    remove.query_pairs_mut().append_pair("redirectUri", &callback);
    let confirm = admin.get(remove.as_str()).await?;
    assert_ok(&confirm)?;
    let form = assert_has_form(&assert_html(&confirm)?, "#remove")?;
    assert_eq!(form.get("RedirectUri"), Some(callback.as_str()));

    let removed = admin.send_form(&form).await?;
    assert_eq!(assert_redirect(&removed)?.path(), application);

    let mut driver = fixture.driver()?;
    let err = run_authorization_code_flow(&mut driver, &fixture.flow, &FlowPlan::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FlowError::UnexpectedStatus { hop: 2, actual: 400, .. }
    ));
    Ok(())
}

#[tokio::test]
async fn test_unknown_scope_is_reported_to_client() -> TestResult {
    let client_id = new_client_id();
    let options = OidcClientOptions::new(&client_id)
        .code_flow()
        .with_resource_scope(RESOURCE_NAME, "write");
    let fixture = SiteFixture::start(&client_id, options, true).await?;
    let mut driver = fixture.driver()?;

    let challenge = driver.get("/Home/About").await?;
    let state = assert_location_has_query_params(&challenge, &["state"])?;
    let rejected = driver.follow(&challenge).await?;

    let params = assert_location_has_query_params(&rejected, &["error", "state"])?;
    assert_eq!(params["error"], "invalid_scope");
    assert_eq!(params["state"], state["state"]);
    assert_eq!(assert_redirect(&rejected)?.path(), "/signin-oidc");

    // The relying party refuses the error callback
    let callback = driver.follow(&rejected).await?;
    assert_eq!(callback.status.as_u16(), 400);
    Ok(())
}

#[tokio::test]
async fn test_unknown_hinted_user_is_rejected() -> TestResult {
    let fixture = SiteFixture::code_flow().await?;
    let flow = fixture.flow.clone().with_user_hint("mallory");
    let mut driver = oidc_flow_check::FlowDriver::from_config(&flow)?;

    let err = run_authorization_code_flow(&mut driver, &flow, &FlowPlan::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FlowError::UnexpectedStatus { hop: 3, actual: 400, .. }
    ));
    Ok(())
}

#[tokio::test]
async fn test_id_token_on_query_is_refused() -> TestResult {
    let client_id = new_client_id();
    let options = OidcClientOptions::new(&client_id).with_response_mode(ResponseMode::Query);
    let fixture = SiteFixture::start(&client_id, options, true).await?;
    let mut driver = fixture.driver()?;

    let err = run_id_token_flow(&mut driver, &fixture.flow, &FlowPlan::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FlowError::UnexpectedStatus { hop: 2, actual: 400, .. }
    ));
    Ok(())
}

#[tokio::test]
async fn test_code_flow_against_form_post_site_fails_at_authorize_hop() -> TestResult {
    let fixture = SiteFixture::id_token_flow().await?;
    let mut driver = fixture.driver()?;

    let err = run_authorization_code_flow(&mut driver, &fixture.flow, &FlowPlan::new())
        .await
        .unwrap_err();

    // The site answers authorize with a 200 form instead of a redirect
    assert!(matches!(
        err,
        FlowError::UnexpectedStatus { hop: 4, actual: 200, .. }
    ));
    Ok(())
}
