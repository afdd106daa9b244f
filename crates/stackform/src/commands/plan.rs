use colored::Colorize;
use stackform_cloud::{StackPlan, StackPlanner};
use stackform_config::Settings;
use std::path::Path;

pub fn handle(template: &Path, settings: &Settings, json: bool) -> anyhow::Result<()> {
    let body = super::read_template(template)?;
    let plan = StackPlanner::new()
        .with_ordering(settings.ordering)
        .plan(&body)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

fn print_plan(plan: &StackPlan) {
    println!("{} (ordering: {})", "Build order".blue(), plan.ordering);

    for (i, step) in plan.steps.iter().enumerate() {
        let kind = step
            .kind
            .map(|k| k.to_string())
            .unwrap_or_else(|| "?".to_string());
        let mut line = format!(
            "  {:>2}. {} ({}, priority {})",
            i + 1,
            step.name.cyan(),
            kind,
            step.priority
        );
        if !step.references.is_empty() {
            let refs: Vec<&str> = step.references.iter().map(String::as_str).collect();
            line.push_str(&format!(" <- {}", refs.join(", ")));
        }
        println!("{}", line);

        if let Some(problem) = &step.problem {
            println!("      {} {}", "✗".red(), problem);
        }
    }

    for (resource, reference) in plan.ordering_violations() {
        println!(
            "{} {} references {}, which is not created before it",
            "⚠".yellow(),
            resource.cyan(),
            reference.cyan()
        );
    }
}
