//! Command implementations.

use crate::cli::{Command, StartArgs};
use crate::output;
use ac_core::app::App;
use ac_core::config::load_config;
use ac_core::controller::Response;
use ac_core::engine::parse_state_id;
use ac_core::init::{generate_authchain_structure, InitOptions};
use ac_protocol::{AuthContext, ChainId, EntityRef};
use chrono::{TimeDelta, Utc};
use color_eyre::eyre::{eyre, WrapErr};
use std::collections::HashMap;
use std::path::Path;
use std::process::ExitCode;

pub async fn run(root: &Path, command: Command) -> color_eyre::Result<ExitCode> {
    match command {
        Command::Init { force } => {
            generate_authchain_structure(InitOptions {
                target_dir: root.to_path_buf(),
                force,
            })
            .await?;
            output::success(&format!("Initialized {}", root.join(".authchain").display()));
            Ok(ExitCode::SUCCESS)
        }
        Command::Check => check(root).await,
        Command::Start(args) => {
            let app = build_app(root).await?;
            let context = build_context(&args)?;
            let controller = app.controller();
            let response = controller.respond(controller.start(&args.chain, context).await);
            finish(&app, &response).await
        }
        Command::Resume {
            chain,
            state_id,
            proceed,
        } => {
            let app = build_app(root).await?;
            let mut query = HashMap::from([("StateId".to_string(), state_id)]);
            if proceed {
                query.insert("continue".to_string(), "1".to_string());
            }
            let controller = app.controller();
            let response = controller.respond(controller.short_sso_interval(&chain, &query).await);
            finish(&app, &response).await
        }
        Command::Abort { chain, state_id } => {
            let app = build_app(root).await?;
            let controller = app.controller();
            let result = match parse_state_id(Some(&state_id)) {
                Ok(id) => controller.abort(&chain, &id).await,
                Err(e) => Err(e),
            };
            app.shutdown().await;
            match result {
                Ok(()) => {
                    output::success(&format!("Aborted {state_id}"));
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    let response = Response::View(controller.render_error(&e));
                    output::response(&response)?;
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Sweep => {
            let app = build_app(root).await?;
            let removed = app.store().purge_expired().await?;
            app.shutdown().await;
            output::success(&format!("Removed {removed} expired state entries"));
            Ok(ExitCode::SUCCESS)
        }
        Command::Nocookie { retry_url } => {
            let app = build_app(root).await?;
            let query: HashMap<String, String> = retry_url
                .map(|url| ("retryURL".to_string(), url))
                .into_iter()
                .collect();
            let response = Response::View(app.controller().nocookie(&query));
            finish(&app, &response).await
        }
    }
}

async fn build_app(root: &Path) -> color_eyre::Result<App> {
    let config = load_config(root)
        .await
        .wrap_err_with(|| format!("Failed to load configuration from {}", root.display()))?;
    Ok(App::build(config)?)
}

async fn check(root: &Path) -> color_eyre::Result<ExitCode> {
    let config = load_config(root).await?;
    App::build(config.clone())?.shutdown().await;

    output::success(&format!("Configuration OK ({} chains)", config.chains.len()));
    if config.chains.is_empty() {
        output::info("No chains defined.");
    }
    for chain in &config.chains {
        let kinds: Vec<_> = chain.steps.iter().map(|step| step.kind()).collect();
        println!("{}: {}", chain.id, kinds.join(" -> "));
    }
    Ok(ExitCode::SUCCESS)
}

fn build_context(args: &StartArgs) -> color_eyre::Result<AuthContext> {
    let chain_id: ChainId = args.chain.parse()?;
    let mut context = AuthContext::new(chain_id);
    for (name, value) in &args.attrs {
        context.add_attribute_value(name, value);
    }
    context.metadata.destination = args.destination.clone().map(EntityRef::new);
    context.metadata.source = args.source.clone().map(|entity_id| {
        let source = EntityRef::new(entity_id);
        match &args.auth_source {
            Some(auth_source) => source.with_auth_source(auth_source),
            None => source,
        }
    });
    if let Some(secs) = args.previous_sso_secs {
        let previous = TimeDelta::try_seconds(secs)
            .and_then(|delta| Utc::now().checked_sub_signed(delta))
            .ok_or_else(|| eyre!("--previous-sso-secs {secs} is out of range"))?;
        context.metadata.previous_sso = Some(previous);
    }
    Ok(context)
}

async fn finish(app: &App, response: &Response) -> color_eyre::Result<ExitCode> {
    app.shutdown().await;
    output::response(response)?;
    if response.status() >= 400 {
        output::error("Request failed");
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
