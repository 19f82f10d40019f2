use std::env;

use oidc_flow_check::{
    FlowConfig, FlowDriver, FlowError, FlowOutcome, FlowPlan, run_authorization_code_flow,
    run_id_token_flow,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod site;

use crate::site::{Flow, start_local_site};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=info,oidc_flow_check=info,oidc_flow_site=info", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Comma separated: code, id_token
    let flows: Vec<Flow> = env::var("OIDC_FLOW_FLOWS")
        .unwrap_or_else(|_| "code,id_token".to_string())
        .split(',')
        .filter_map(Flow::parse)
        .collect();
    let plan = match (env::var("OIDC_FLOW_USERNAME"), env::var("OIDC_FLOW_PASSWORD")) {
        (Ok(username), Ok(password)) => FlowPlan::new().with_credentials(&username, &password),
        _ => FlowPlan::new(),
    };

    let mut failed = 0;
    for flow in flows {
        let result = match env::var("OIDC_FLOW_TARGET_ORIGIN") {
            Ok(_) => run(flow, &FlowConfig::from_env(), &plan).await,
            Err(_) => {
                let site = start_local_site(flow).await?;
                let config = FlowConfig::for_origin(&site.base_url);
                let result = run(flow, &config, &plan).await;
                site.shutdown();
                result
            }
        };

        match result {
            Ok(outcome) => println!("{}", serde_json::to_string_pretty(&outcome)?),
            Err(e) => {
                failed += 1;
                tracing::error!("{} flow failed: {e}", flow.as_str());
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} flow(s) failed").into());
    }
    Ok(())
}

async fn run(flow: Flow, config: &FlowConfig, plan: &FlowPlan) -> Result<FlowOutcome, FlowError> {
    tracing::info!("Running {} flow against {}", flow.as_str(), config.origin);
    let mut driver = FlowDriver::from_config(config)?;
    match flow {
        Flow::AuthorizationCode => run_authorization_code_flow(&mut driver, config, plan).await,
        Flow::IdToken => run_id_token_flow(&mut driver, config, plan).await,
    }
}
