//! End-to-end sign-in scenarios built from driver hops and assertions.
//!
//! Both flows share the first three hops: the unauthenticated resource request
//! that sets the correlation and nonce cookies, the authorize request that
//! bounces to the login page, and the login itself. They differ in how the
//! identity provider hands the result back to the relying party.

mod plan;

pub use plan::{FlowOutcome, FlowPlan, HopSummary, LoginMode};

use url::Url;

use crate::config::FlowConfig;
use crate::cookies::{ComparisonCriteria, ExpectedCookie};
use crate::driver::{FlowDriver, FlowStep};
use crate::errors::FlowError;
use crate::response_assert::{
    assert_has_cookie_named, assert_has_cookie_within, assert_has_form, assert_html,
    assert_location_has_query_params, assert_ok, assert_parameter_equals, assert_redirect,
};

/// Hops recorded while a scenario runs
struct Trace {
    hops: Vec<HopSummary>,
}

impl Trace {
    fn new() -> Self {
        Self { hops: Vec::new() }
    }

    fn record(&mut self, step: FlowStep) -> FlowStep {
        self.hops.push(HopSummary::from(&step));
        step
    }
}

/// Drive the Authorization Code flow and check every hop.
///
/// `resource → authorize → login → authorize → callback(code, state) → resource`
#[tracing::instrument(skip_all, fields(resource = %plan.resource_path))]
pub async fn run_authorization_code_flow(
    driver: &mut FlowDriver,
    config: &FlowConfig,
    plan: &FlowPlan,
) -> Result<FlowOutcome, FlowError> {
    let mut trace = Trace::new();

    let (challenge, state) = request_resource(driver, config, plan, &mut trace).await?;
    let login_done = sign_in(driver, config, plan, &challenge, &mut trace).await?;

    let authorized = trace.record(driver.follow(&login_done).await?);
    assert_has_cookie_named(&config.application_cookie_name, &authorized)?;
    let params = assert_location_has_query_params(&authorized, &["code", "state"])?;
    assert_parameter_equals(&authorized, "state", &state, &params["state"])?;
    tracing::debug!("Authorize redirected to callback with state {state}");

    let callback = trace.record(driver.follow(&authorized).await?);
    check_callback(&callback, config, plan)?;

    finish(driver, &callback, trace, state, params.get("code").cloned()).await
}

/// Drive the Implicit/ID-Token flow with `form_post` response mode.
///
/// `resource → authorize → login → authorize(auto-submit form) → callback → resource`
#[tracing::instrument(skip_all, fields(resource = %plan.resource_path))]
pub async fn run_id_token_flow(
    driver: &mut FlowDriver,
    config: &FlowConfig,
    plan: &FlowPlan,
) -> Result<FlowOutcome, FlowError> {
    let mut trace = Trace::new();

    let (challenge, state) = request_resource(driver, config, plan, &mut trace).await?;
    let login_done = sign_in(driver, config, plan, &challenge, &mut trace).await?;

    let authorized = trace.record(driver.follow(&login_done).await?);
    assert_ok(&authorized)?;
    assert_has_cookie_named(&config.application_cookie_name, &authorized)?;
    let document = assert_html(&authorized)?;

    let forms = document.forms()?;
    if forms.len() != 1 || !document.is_auto_submitting() {
        return Err(FlowError::FormNotFound {
            hop: authorized.hop,
            selector: format!(
                "exactly one auto-submitting form (found {} form(s))",
                forms.len()
            ),
        });
    }
    let form = assert_has_form(&document, "form")?;
    match form.get("id_token") {
        Some(token) if !token.is_empty() => {}
        _ => {
            return Err(FlowError::MissingParameter {
                hop: authorized.hop,
                name: "id_token".to_string(),
            });
        }
    }
    let posted_state = form.get("state").ok_or_else(|| FlowError::MissingParameter {
        hop: authorized.hop,
        name: "state".to_string(),
    })?;
    assert_parameter_equals(&authorized, "state", &state, posted_state)?;
    tracing::debug!("Authorize rendered form_post to {}", form.action);

    let callback = trace.record(driver.send_form(&form).await?);
    check_callback(&callback, config, plan)?;

    finish(driver, &callback, trace, state, None).await
}

/// Hop 1: the unauthenticated resource request challenges with a redirect to
/// authorize, sets the correlation and nonce cookies and carries `state`.
async fn request_resource(
    driver: &mut FlowDriver,
    config: &FlowConfig,
    plan: &FlowPlan,
    trace: &mut Trace,
) -> Result<(FlowStep, String), FlowError> {
    let challenge = trace.record(driver.get(&plan.resource_path).await?);
    assert_redirect(&challenge)?;

    for prefix in [&config.nonce_cookie_prefix, &config.correlation_cookie_prefix] {
        let expected = ExpectedCookie::new(prefix, "N")
            .with_path("/")
            .secure()
            .http_only()
            .expires_in(config.oidc_cookie_lifetime);
        assert_has_cookie_within(&expected, &challenge, by_prefix(), config.expiry_tolerance)?;
    }

    let mut params = assert_location_has_query_params(&challenge, &["state"])?;
    let state = params.remove("state").unwrap_or_default();
    Ok((challenge, state))
}

/// Hops 2 and 3 (and 4 with credentials): authorize bounces to login, login
/// stamps the identity cookie and redirects back to authorize.
async fn sign_in(
    driver: &mut FlowDriver,
    config: &FlowConfig,
    plan: &FlowPlan,
    challenge: &FlowStep,
    trace: &mut Trace,
) -> Result<FlowStep, FlowError> {
    let unauthenticated = trace.record(driver.follow(challenge).await?);
    assert_redirect(&unauthenticated)?;

    let login_done = match &plan.login {
        LoginMode::Automatic => trace.record(driver.follow(&unauthenticated).await?),
        LoginMode::Credentials { username, password } => {
            let page = trace.record(driver.follow(&unauthenticated).await?);
            assert_ok(&page)?;
            let document = assert_html(&page)?;
            let mut form = assert_has_form(&document, "form")?;
            form.set("Username", username);
            form.set("Password", password);
            trace.record(driver.send_form(&form).await?)
        }
    };

    assert_redirect(&login_done)?;
    assert_has_cookie_named(&config.identity_cookie_name, &login_done)?;
    tracing::debug!("Signed in at hop #{}", login_done.hop);
    Ok(login_done)
}

/// Callback hop: redirect to the resource, session cookie set, correlation
/// and nonce cookies deleted.
fn check_callback(
    callback: &FlowStep,
    config: &FlowConfig,
    plan: &FlowPlan,
) -> Result<(), FlowError> {
    let location = assert_redirect(callback)?;
    assert_parameter_equals(
        callback,
        "Location",
        &plan.resource_path,
        &local_target(&location),
    )?;
    assert_has_cookie_named(&config.session_cookie_name, callback)?;

    for prefix in [&config.correlation_cookie_prefix, &config.nonce_cookie_prefix] {
        let deleted = ExpectedCookie::named(prefix).deleted();
        assert_has_cookie_within(
            &deleted,
            callback,
            ComparisonCriteria::NAME_STARTS_WITH | ComparisonCriteria::DELETE,
            config.expiry_tolerance,
        )?;
    }
    Ok(())
}

/// Final hop: the protected resource answers 200 with an HTML document
async fn finish(
    driver: &mut FlowDriver,
    callback: &FlowStep,
    mut trace: Trace,
    state: String,
    code: Option<String>,
) -> Result<FlowOutcome, FlowError> {
    let resource = trace.record(driver.follow(callback).await?);
    assert_ok(&resource)?;
    assert_html(&resource)?;
    tracing::info!("Flow completed in {} hops", trace.hops.len());

    Ok(FlowOutcome {
        hops: trace.hops,
        state,
        code,
        cookies: driver.jar().names().into_iter().map(str::to_string).collect(),
    })
}

/// Strict comparison with the name matched as a prefix
fn by_prefix() -> ComparisonCriteria {
    ComparisonCriteria::STRICT & !ComparisonCriteria::NAME_EQUALS
        | ComparisonCriteria::NAME_STARTS_WITH
}

fn local_target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    }
}
