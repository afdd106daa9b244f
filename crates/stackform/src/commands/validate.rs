use colored::Colorize;
use stackform_cloud::{StackPlanner, ValidationReport};
use stackform_config::Settings;
use std::path::Path;

/// Returns whether every resource in the template is buildable
pub fn handle(
    template: &Path,
    stack_name: &str,
    settings: &Settings,
    json: bool,
) -> anyhow::Result<bool> {
    let body = super::read_template(template)?;
    let planner = StackPlanner::new().with_ordering(settings.ordering);
    let report = planner.validate(&body, stack_name)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
    } else {
        print_report(template, &report);
    }

    Ok(report.is_valid())
}

fn report_json(report: &ValidationReport) -> serde_json::Value {
    let resources: Vec<serde_json::Value> = report
        .resources
        .iter()
        .map(|r| match &r.result {
            Ok(request) => serde_json::json!({
                "name": r.name,
                "priority": r.priority,
                "valid": true,
                "request": request,
            }),
            Err(error) => serde_json::json!({
                "name": r.name,
                "priority": r.priority,
                "valid": false,
                "error": error.to_string(),
            }),
        })
        .collect();

    serde_json::json!({
        "stack": report.stack_name,
        "valid": report.is_valid(),
        "resources": resources,
    })
}

fn print_report(template: &Path, report: &ValidationReport) {
    println!("{} {}", "Validating".blue(), template.display());

    for resource in &report.resources {
        match &resource.result {
            Ok(_) => println!("  {} {}", "✓".green(), resource.name.cyan()),
            Err(error) => eprintln!("  {} {}: {}", "✗".red(), resource.name.cyan(), error),
        }
    }

    println!();
    if report.is_valid() {
        println!(
            "{} ({} resources)",
            "✓ Template is valid".green().bold(),
            report.resources.len()
        );
    } else {
        eprintln!(
            "{} ({} of {} resources)",
            "✗ Template has errors".red().bold(),
            report.errors().count(),
            report.resources.len()
        );
    }
}
