use anyhow::Context;
use colored::Colorize;
use stackform_cloud::{
    CreateStackRequest, CreateStackResponse, ResourceOutcome, StackEngine, StackStatus,
};
use stackform_cloud_digitalocean::{DigitalOceanClient, DigitalOceanConfig};
use stackform_config::Settings;
use std::path::Path;
use std::sync::Arc;

pub async fn handle(
    template: &Path,
    stack_name: &str,
    settings: &Settings,
    json: bool,
) -> anyhow::Result<StackStatus> {
    let body = super::read_template(template)?;

    let config = DigitalOceanConfig::new(settings.require_token()?)
        .with_base_url(&settings.api_base_url)
        .with_timeout(settings.request_timeout());
    let client = DigitalOceanClient::new(config).context("failed to set up DigitalOcean client")?;
    let engine = StackEngine::new(Arc::new(client)).with_ordering(settings.ordering);

    if !json {
        println!(
            "{} {} ({})",
            "Creating stack".blue(),
            stack_name.cyan().bold(),
            template.display()
        );
    }

    let response = engine
        .create_stack(CreateStackRequest::new(body, stack_name))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }

    Ok(response.status)
}

fn print_response(response: &CreateStackResponse) {
    println!();
    for outcome in &response.outcomes {
        match outcome {
            ResourceOutcome::Created(created) => println!(
                "  {} {} ({}) id={}",
                "✓".green(),
                created.name.cyan(),
                created.kind,
                created.handle.id
            ),
            ResourceOutcome::Failed(failure) => println!(
                "  {} {}: {}",
                "✗".red(),
                failure.name.cyan(),
                failure.error
            ),
        }
    }

    println!();
    let summary = format!(
        "{} created, {} failed",
        response.succeeded_count(),
        response.failed_count()
    );
    match response.status {
        StackStatus::Created => println!("{} {}", "✓ Stack created:".green().bold(), summary),
        StackStatus::PartiallyFailed => {
            println!("{} {}", "⚠ Stack partially failed:".yellow().bold(), summary)
        }
        StackStatus::Failed => println!("{} {}", "✗ Stack failed:".red().bold(), summary),
    }
}
