use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use formforge_forms::{
    directives::parse_directives,
    prelude::{
        ClientIdentity, CommandDefinition, CommandForm, CommandOutcome, FormCommander,
        FormComponent, FormRequest, FormResponse, FormTelemetry, LoopbackBackend,
        LoopbackTransport, MenuDocument, ResponseValue,
    },
};
use serde::Serialize;
use serde_json::json;
use shared_event_bus::FileEventPublisher;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "formctl", version, about = "Directive form inspector and local driver")]
struct Cli {
    #[command(flatten)]
    telemetry: TelemetryArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct TelemetryArgs {
    /// JSON-lines log file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    /// JSON-lines event log.
    #[arg(long, global = true)]
    event_log: Option<PathBuf>,
    /// Keeps debug-level records.
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Prints the directives of a template and the form they render to.
    Inspect {
        template: String,
        #[arg(long, default_value = "")]
        title: String,
    },
    /// Renders a template, answers it with scripted values and dispatches locally.
    Resolve(ResolveArgs),
    /// Prints the menu buttons a user would see.
    Menu {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        menu: Option<String>,
        #[arg(long, default_value = "player")]
        user: String,
    },
}

#[derive(Args, Debug)]
struct ResolveArgs {
    template: String,
    #[arg(long, default_value = "")]
    title: String,
    #[arg(long, default_value = "player")]
    user: String,
    /// One value per widget, in order; `-` or empty keeps the default.
    #[arg(long = "answer")]
    answers: Vec<String>,
    /// Closes the form instead of submitting it.
    #[arg(long)]
    close: bool,
}

#[derive(Serialize)]
struct ResolveReport {
    outcome: CommandOutcome,
    dispatched: Vec<String>,
}

fn main() -> Result<()> {
    if let Some(filter) = tracing_filter("RUST_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();
    match cli.command {
        Commands::Inspect { template, title } => handle_inspect(&template, title),
        Commands::Resolve(args) => handle_resolve(&cli.telemetry, args),
        Commands::Menu { config, menu, user } => {
            handle_menu(&cli.telemetry, &config, menu.as_deref(), user)
        }
    }
}

/// Tracing stays silent unless `var` holds a filter.
fn tracing_filter(var: &str) -> Option<EnvFilter> {
    EnvFilter::try_from_env(var).ok()
}

fn handle_inspect(template: &str, title: String) -> Result<()> {
    let directives = parse_directives(template)?;
    let report = match CommandForm::assemble(title, template)? {
        Some(form) => json!({ "directives": directives, "form": form.request() }),
        None => json!({ "directives": directives, "literal": template }),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn handle_resolve(telemetry: &TelemetryArgs, args: ResolveArgs) -> Result<()> {
    let transport = LoopbackTransport::new();
    let backend = LoopbackBackend::new();
    let commander = commander(telemetry, &transport, &backend, false)?;

    let identity = ClientIdentity::new(args.user);
    let definition = CommandDefinition::new(args.title, args.template);
    let pending = commander.execute_command(&identity, &definition);

    if let Some(form) = transport.next_form() {
        if args.close {
            form.close();
        } else {
            let values = match &form.form {
                FormRequest::Command { components, .. } => scripted_values(components, &args.answers)?,
                FormRequest::Menu { .. } => bail!("expected a command form"),
            };
            form.submit(FormResponse::Command(values));
        }
    }

    let outcome: CommandOutcome = Runtime::new()?.block_on(pending.outcome()).into();
    let report = ResolveReport {
        outcome,
        dispatched: backend.commands(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn handle_menu(
    telemetry: &TelemetryArgs,
    config: &Path,
    menu: Option<&str>,
    user: String,
) -> Result<()> {
    let document = MenuDocument::load(config)?;
    let id = match menu.or_else(|| document.entry_menu()) {
        Some(id) => id.to_owned(),
        None => bail!("{} defines no menus", config.display()),
    };
    let definition = document.menu(&id)?;

    let transport = LoopbackTransport::new();
    let backend = LoopbackBackend::new();
    let commander = commander(telemetry, &transport, &backend, document.debug)?;
    let _selection = commander.send_menu(&ClientIdentity::new(user), definition);

    let form = transport
        .next_form()
        .context("menu was not rendered")?;
    println!("{}", serde_json::to_string_pretty(&form.form)?);
    form.close();
    Ok(())
}

fn commander(
    telemetry: &TelemetryArgs,
    transport: &LoopbackTransport,
    backend: &LoopbackBackend,
    debug: bool,
) -> Result<FormCommander> {
    let mut builder = FormTelemetry::builder("formctl").debug(telemetry.debug || debug);
    if let Some(path) = &telemetry.log_file {
        builder = builder.log_path(path);
    }
    if let Some(path) = &telemetry.event_log {
        builder = builder.event_publisher(Arc::new(FileEventPublisher::new(path)?));
    }
    Ok(
        FormCommander::builder(Arc::new(transport.clone()), Arc::new(backend.clone()))
            .telemetry(builder.build()?)
            .build(),
    )
}

fn scripted_values(
    components: &[FormComponent],
    answers: &[String],
) -> Result<Vec<Option<ResponseValue>>> {
    if answers.len() > components.len() {
        bail!(
            "{} answers given for {} widgets",
            answers.len(),
            components.len()
        );
    }
    components
        .iter()
        .zip(answers)
        .map(|(component, answer)| parse_answer(component, answer))
        .collect()
}

fn parse_answer(component: &FormComponent, answer: &str) -> Result<Option<ResponseValue>> {
    if answer.is_empty() || answer == "-" {
        return Ok(None);
    }
    let value = match component {
        FormComponent::Input { .. } => ResponseValue::Text(answer.to_owned()),
        FormComponent::Toggle { .. } => ResponseValue::Toggle(
            answer
                .parse()
                .with_context(|| format!("toggle answer `{answer}`"))?,
        ),
        FormComponent::Dropdown { .. } | FormComponent::StepSlider { .. } => ResponseValue::Index(
            answer
                .parse()
                .with_context(|| format!("index answer `{answer}`"))?,
        ),
        FormComponent::Slider { .. } => ResponseValue::Number(
            answer
                .parse()
                .with_context(|| format!("slider answer `{answer}`"))?,
        ),
    };
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn components() -> Vec<FormComponent> {
        match CommandForm::assemble(
            "t",
            "x !%a:input:A, a% !%b:toggle:B, false% !%c:dropdown:C, r, r, g% !%d:slider:D, 0, 10, 1, 5%",
        )
        .unwrap()
        .unwrap()
        .request()
        {
            FormRequest::Command { components, .. } => components,
            FormRequest::Menu { .. } => unreachable!(),
        }
    }

    #[test]
    fn tracing_is_off_without_a_filter_variable() {
        assert!(tracing_filter("FORMCTL_UNSET_LOG_FILTER").is_none());
    }

    #[test]
    fn answers_follow_widget_kinds() {
        let answers: Vec<String> = ["hi", "true", "1", "7.5"].map(String::from).into();
        let values = scripted_values(&components(), &answers).unwrap();
        assert_eq!(
            values,
            vec![
                Some(ResponseValue::Text("hi".into())),
                Some(ResponseValue::Toggle(true)),
                Some(ResponseValue::Index(1)),
                Some(ResponseValue::Number(7.5)),
            ]
        );
    }

    #[test]
    fn dash_keeps_default_and_bad_numbers_fail() {
        let values = scripted_values(&components(), &["-".to_string()]).unwrap();
        assert_eq!(values, vec![None]);
        let bad: Vec<String> = ["a", "b"].map(String::from).into();
        assert!(scripted_values(&components(), &bad).is_err());
    }
}
