//! Command parsing and execution for the `gdprdesk` binary.

use std::io::{self, Write};

use anyhow::{anyhow, bail, Result};
use gdprdesk_core::config::Config;
use gdprdesk_core::models::{
    AdvanceOutcome, DataSubjectQuery, GenerateDocumentRequest, RequestType, ResourceId,
    SubjectRequestForm, WorkflowStatus,
};
use gdprdesk_core::SessionStore;
use tracing::{info, warn};

pub const USAGE: &str = "\
Usage: gdprdesk <command> [args]

Commands:
  login [username]                 Sign in and store the session token
  logout                           Sign out and forget the token
  whoami                           Show the signed-in user
  status                           Overview of subjects, requests and workflows
  subjects [search]                List data subjects
  consents <subject-id>            Show a subject's consent history
  requests                         List data subject requests
  request <type> <email> <first-name> <last-name> [details]
                                   File a request and start its workflow
                                   (access, rectification, erasure, restriction,
                                   portability, objection, not_automated)
  workflows [status]               List workflows (pending, in_progress, completed)
  advance <workflow-id>            Advance a workflow to its next step
  templates                        List active document templates
  template <template-id>           Show a document template
  generate <template-id> <subject-id>
                                   Generate a document for a data subject

Environment:
  GDPRDESK_API_URL                 API base URL (default http://localhost:8000/api/)
  RUST_LOG                         Log filter (default warn)";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { username: Option<String> },
    Logout,
    WhoAmI,
    Status,
    Subjects { search: Option<String> },
    Consents { subject_id: ResourceId },
    Requests,
    Request { form: SubjectRequestForm },
    Workflows { status: Option<WorkflowStatus> },
    Advance { workflow_id: ResourceId },
    Templates,
    Template { template_id: ResourceId },
    Generate { template_id: ResourceId, subject_id: ResourceId },
    Help,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut args = args.iter().map(String::as_str);
        let command = match args.next() {
            None | Some("help") | Some("--help") | Some("-h") => return Ok(Command::Help),
            Some(c) => c,
        };
        let rest: Vec<&str> = args.collect();

        let required = |i: usize, name: &str| -> Result<ResourceId> {
            rest.get(i)
                .map(|s| ResourceId::from(*s))
                .ok_or_else(|| anyhow!("Missing <{}> for `{}`", name, command))
        };

        let parsed = match command {
            "login" => Command::Login {
                username: rest.first().map(|s| s.to_string()),
            },
            "logout" => Command::Logout,
            "whoami" => Command::WhoAmI,
            "status" => Command::Status,
            "subjects" => Command::Subjects {
                search: (!rest.is_empty()).then(|| rest.join(" ")),
            },
            "consents" => Command::Consents {
                subject_id: required(0, "subject-id")?,
            },
            "requests" => Command::Requests,
            "request" => {
                let text = |i: usize, name: &str| -> Result<String> {
                    rest.get(i)
                        .map(|s| s.to_string())
                        .ok_or_else(|| anyhow!("Missing <{}> for `{}`", name, command))
                };
                let request_type = text(0, "type")?
                    .parse::<RequestType>()
                    .map_err(|e| anyhow!(e))?;
                Command::Request {
                    form: SubjectRequestForm {
                        request_type,
                        email: text(1, "email")?,
                        first_name: text(2, "first-name")?,
                        last_name: text(3, "last-name")?,
                        request_details: rest.get(4..).map(|d| d.join(" ")).unwrap_or_default(),
                    },
                }
            }
            "workflows" => Command::Workflows {
                status: rest
                    .first()
                    .map(|s| s.parse::<WorkflowStatus>())
                    .transpose()
                    .map_err(|e| anyhow!(e))?,
            },
            "advance" => Command::Advance {
                workflow_id: required(0, "workflow-id")?,
            },
            "templates" => Command::Templates,
            "template" => Command::Template {
                template_id: required(0, "template-id")?,
            },
            "generate" => Command::Generate {
                template_id: required(0, "template-id")?,
                subject_id: required(1, "subject-id")?,
            },
            other => bail!("Unknown command `{}`\n\n{}", other, USAGE),
        };
        Ok(parsed)
    }

    /// Commands that work without a session
    fn is_public(&self) -> bool {
        matches!(self, Command::Login { .. } | Command::Logout | Command::Help)
    }
}

pub async fn run(command: Command, store: &SessionStore, config: &mut Config) -> Result<()> {
    if !command.is_public() && !store.handle().is_authenticated() {
        bail!("Not signed in. Run `gdprdesk login` first.");
    }

    let api = store.api();
    match command {
        Command::Help => println!("{}", USAGE),
        Command::Login { username } => login(store, config, username).await?,
        Command::Logout => {
            store.logout().await;
            println!("Signed out.");
        }
        Command::WhoAmI => {
            let user = store
                .handle()
                .user()
                .ok_or_else(|| anyhow!("Signed in, but the server sent no user details"))?;
            println!("{}", user.display_name());
            if let Some(ref email) = user.email {
                println!("  email:        {}", email);
            }
            if let Some(ref title) = user.job_title {
                println!("  job title:    {}", title);
            }
            if let Some(ref org) = user.organization {
                println!("  organization: {}", org);
            }
            println!("  admin:        {}", user.is_admin);
        }
        Command::Status => {
            let subject_query = DataSubjectQuery::default();
            let (subjects, requests, in_progress) = futures::try_join!(
                api.list_data_subjects(&subject_query),
                api.list_subject_requests(None),
                api.list_workflows(Some(WorkflowStatus::InProgress)),
            )?;
            println!("Data subjects:         {}", subjects.count);
            println!("Subject requests:      {}", requests.count);
            println!("Workflows in progress: {}", in_progress.count);
        }
        Command::Subjects { search } => {
            let page = api
                .list_data_subjects(&DataSubjectQuery {
                    search,
                    ..Default::default()
                })
                .await?;
            for s in &page.results {
                println!(
                    "{:<38} {:<28} {:<32} marketing={} processing={} cookies={}",
                    s.id.to_string(),
                    s.full_name(),
                    s.email,
                    s.marketing_consent,
                    s.data_processing_consent,
                    s.cookie_consent
                );
            }
            println!("({} of {}, {} pages)", page.results.len(), page.count, page.total_pages());
        }
        Command::Consents { subject_id } => {
            let activities = api.consent_activities(&subject_id).await?;
            if activities.is_empty() {
                println!("No consent activity recorded.");
            }
            for a in activities {
                let when = a
                    .timestamp
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{:<16} {:<18} {:<16} {}",
                    when,
                    format!("{:?}", a.activity_type),
                    a.consent_type.unwrap_or_default(),
                    a.notes.unwrap_or_default()
                );
            }
        }
        Command::Requests => {
            let page = api.list_subject_requests(None).await?;
            for r in &page.results {
                let due = r
                    .due_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<38} {:<14} {:<28} {:<12} due {}",
                    r.id.to_string(),
                    format!("{:?}", r.request_type),
                    r.data_subject_name,
                    r.status.as_deref().unwrap_or("-"),
                    due
                );
            }
            println!("({} of {})", page.results.len(), page.count);
        }
        Command::Request { form } => {
            let submitted = api.submit_subject_request(&form).await?;
            if submitted.created_subject {
                println!("Registered data subject {}.", submitted.data_subject_id);
            }
            println!(
                "Filed {:?} request {} for {}.",
                submitted.request.request_type,
                submitted.request.id,
                submitted.request.data_subject_name
            );
            match submitted.workflow {
                Some(workflow) => println!("Started workflow {}.", workflow["id"]),
                None => println!(
                    "No {} workflow template found; no workflow started.",
                    form.request_type.workflow_type().as_str()
                ),
            }
        }
        Command::Workflows { status } => {
            let page = api.list_workflows(status).await?;
            for w in &page.results {
                let step = w.current_step().map(|s| s.name.as_str()).unwrap_or("-");
                let progress = w
                    .progress_percentage
                    .map(|p| format!("{:.0}%", p))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<38} {:<32} {:<12} {:>5} {}",
                    w.id.to_string(),
                    w.name,
                    w.status.as_deref().unwrap_or("-"),
                    progress,
                    step
                );
            }
            println!("({} of {})", page.results.len(), page.count);
        }
        Command::Advance { workflow_id } => match api.advance_workflow(&workflow_id).await? {
            AdvanceOutcome::Advanced { current_step } => {
                println!("Advanced to step {}: {}", current_step.order, current_step.name);
            }
            AdvanceOutcome::Completed { message } => {
                println!("{}", message.unwrap_or_else(|| "Workflow completed".to_string()));
            }
        },
        Command::Templates => {
            for t in api.list_document_templates().await? {
                println!(
                    "{:<38} {:<40} {}",
                    t.id.to_string(),
                    t.title,
                    t.document_type.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Template { template_id } => {
            let doc = api.get_document(&template_id).await?;
            println!("# {} ({})", doc.title, doc.id);
            println!(
                "type {}  status {}  version {}\n",
                doc.document_type.as_deref().unwrap_or("-"),
                doc.status.as_deref().unwrap_or("-"),
                doc.version.as_deref().unwrap_or("-")
            );
            println!("{}", doc.content);
        }
        Command::Generate { template_id, subject_id } => {
            let doc = api
                .generate_document(&template_id, &GenerateDocumentRequest::for_subject(subject_id))
                .await?;
            println!("# {} ({})\n", doc.title, doc.id);
            println!("{}", doc.content);
        }
    }
    Ok(())
}

async fn login(store: &SessionStore, config: &mut Config, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(u) => u,
        None => prompt_username(config.last_username.as_deref())?,
    };
    if username.is_empty() {
        bail!("Username required");
    }
    let password = rpassword::prompt_password("Password: ")?;

    match store.login(&username, &password).await {
        Ok(session) => {
            let name = session
                .user
                .map(|u| u.display_name())
                .unwrap_or_else(|| username.clone());
            config.last_username = Some(username);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            info!("Login successful");
            println!("Signed in as {}.", name);
            Ok(())
        }
        Err(e) => bail!("Login failed: {}", e.user_message()),
    }
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match (input.is_empty(), last) {
        (true, Some(last)) => last.to_string(),
        _ => input.to_string(),
    })
}
