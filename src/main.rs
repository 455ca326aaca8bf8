mod api;
mod config;
mod export;
mod files;
mod models;
mod normalize;
mod query;
mod session;
mod workflow;

use anyhow::{Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use api::{ApiClient, FileUpload, HttpTransport, MutationOutcome};
use config::Config;
use export::ExportFormat;
use files::FileAction;
use models::{Grievance, GrievanceStatus, Record, status_badge};
use normalize::Normalized;
use query::{ListQuery, PAGE_SIZES, PageView, SortDir, filter_sort, view};
use session::{FileSession, Session};
use workflow::TransitionController;

#[derive(Parser)]
#[command(name = "etribe")]
#[command(about = "Etribe admin console - circulars, grievances, contacts, resumes and roles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store session credentials
    Login {
        /// User id issued at login
        #[arg(short, long)]
        uid: String,

        /// Bearer token issued at login
        #[arg(short, long)]
        token: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the stored session
    Whoami,

    /// Manage circulars
    Circulars {
        #[command(subcommand)]
        command: CircularCommands,
    },

    /// Manage grievances
    Grievances {
        #[command(subcommand)]
        command: GrievanceCommands,
    },

    /// Manage important contacts
    Contacts {
        #[command(subcommand)]
        command: ContactCommands,
    },

    /// Manage candidate resumes
    Resumes {
        #[command(subcommand)]
        command: ResumeCommands,
    },

    /// Manage user roles
    Roles {
        #[command(subcommand)]
        command: RoleCommands,
    },
}

#[derive(Args, Clone)]
struct ListArgs {
    /// Free-text filter across the searchable columns
    #[arg(short, long, default_value = "")]
    search: String,

    /// Sort column
    #[arg(long)]
    sort: Option<String>,

    /// Sort descending
    #[arg(long)]
    desc: bool,

    /// Page number (1-indexed)
    #[arg(short, long, default_value_t = 1)]
    page: usize,

    /// Records per page (5, 10, 25, 50 or 100)
    #[arg(long, default_value_t = query::DEFAULT_PAGE_SIZE)]
    page_size: usize,
}

impl ListArgs {
    fn to_query<R: Record>(&self) -> Result<ListQuery> {
        let mut query = ListQuery::default();
        query.set_search(&self.search);
        if !query.set_page_size(self.page_size) {
            bail!("Page size must be one of {:?}", PAGE_SIZES);
        }
        if let Some(sort) = &self.sort {
            if !R::SORT_KEYS.contains(&sort.as_str()) {
                bail!(
                    "Unknown sort column '{}'. Available: {}",
                    sort,
                    R::SORT_KEYS.join(", ")
                );
            }
            query.sort_key = Some(sort.clone());
        } else {
            query.sort_key = R::DEFAULT_SORT.map(String::from);
        }
        query.sort_dir = if self.desc { SortDir::Desc } else { SortDir::Asc };
        query.page = self.page.max(1);
        Ok(query)
    }
}

#[derive(Args, Clone)]
struct ExportArgs {
    /// Output form: clipboard, csv, xlsx or pdf
    #[arg(short, long)]
    format: String,

    /// Output file path (defaults to <entity>.<ext> in the current directory)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Free-text filter applied before export
    #[arg(short, long, default_value = "")]
    search: String,

    /// Sort column applied before export
    #[arg(long)]
    sort: Option<String>,

    /// Sort descending
    #[arg(long)]
    desc: bool,
}

#[derive(Subcommand)]
enum CircularCommands {
    /// List circulars
    List(ListArgs),

    /// Show one circular in full
    Show {
        /// Circular id
        id: i64,
    },

    /// Publish a circular
    Add {
        /// Circular number
        #[arg(long)]
        number: String,

        /// Subject line
        #[arg(long)]
        subject: String,

        /// Body text
        #[arg(long, default_value = "")]
        description: String,

        /// Calendar date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Optional attachment to upload
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Edit a circular (omitting --file keeps the existing attachment)
    Edit {
        /// Circular id
        id: i64,

        #[arg(long)]
        number: String,

        #[arg(long)]
        subject: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long)]
        date: String,

        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Delete a circular
    Delete {
        /// Circular id
        id: i64,

        /// Skip the typed confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Open a circular's attachment
    Open {
        /// Circular id
        id: i64,
    },

    /// Export the filtered list
    Export(ExportArgs),
}

#[derive(Subcommand)]
enum GrievanceCommands {
    /// List grievances
    List(ListArgs),

    /// Show one grievance in full
    Show {
        /// Grievance id
        id: i64,
    },

    /// Move a grievance to a new status (active, pending, closed)
    SetStatus {
        /// Grievance id
        id: i64,

        /// Target status
        status: String,
    },

    /// Hide a grievance from this listing only (the backend has no delete)
    Hide {
        /// Grievance id
        id: i64,
    },

    /// Export the filtered list
    Export(ExportArgs),
}

#[derive(Subcommand)]
enum ContactCommands {
    /// List important contacts
    List(ListArgs),

    /// Add a contact
    Add {
        #[arg(long)]
        department: String,

        #[arg(long)]
        name: String,

        /// Phone number
        #[arg(long)]
        contact: String,

        #[arg(long)]
        email: String,

        #[arg(long, default_value = "")]
        address: String,
    },

    /// Edit a contact
    Edit {
        /// Contact id
        id: i64,

        #[arg(long)]
        department: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        contact: String,

        #[arg(long)]
        email: String,

        #[arg(long, default_value = "")]
        address: String,
    },

    /// Delete a contact
    Delete {
        /// Contact id
        id: i64,

        /// Skip the typed confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Export the filtered list
    Export(ExportArgs),
}

#[derive(Subcommand)]
enum ResumeCommands {
    /// List uploaded resumes
    List(ListArgs),

    /// Show one resume in full
    Show {
        /// Resume id
        id: i64,
    },

    /// Upload a candidate resume (pdf, doc or docx, up to 10 MB)
    Upload {
        #[arg(long)]
        name: String,

        #[arg(long)]
        contact: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        qualification: String,

        #[arg(long, default_value = "")]
        skills: String,

        #[arg(long)]
        experience: String,

        /// Resume file
        file: PathBuf,
    },

    /// Delete a resume
    Delete {
        /// Resume id
        id: i64,

        /// Skip the typed confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Open a candidate's resume file
    Open {
        /// Resume id
        id: i64,
    },

    /// Export the filtered list
    Export(ExportArgs),
}

#[derive(Subcommand)]
enum RoleCommands {
    /// List user roles
    List(ListArgs),

    /// Add a role
    Add {
        /// Role name
        name: String,
    },

    /// Rename a role
    Rename {
        /// Role id
        id: i64,

        /// New name
        name: String,
    },

    /// Delete a role
    Delete {
        /// Role id
        id: i64,

        /// Skip the typed confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Export the filtered list
    Export(ExportArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let session = FileSession::open()?;
    let transport = HttpTransport::new();
    let client = ApiClient::new(config, &session, &transport);

    match cli.command {
        Commands::Login { uid, token } => {
            session.save(&token, &uid)?;
            println!("Session stored at {}", session.path().display());
        }

        Commands::Logout => {
            session.clear()?;
            println!("Session cleared.");
        }

        Commands::Whoami => match (session.user_id(), session.token()) {
            (Some(uid), Some(_)) => println!("Logged in as user {}", uid),
            _ => println!("Not logged in."),
        },

        Commands::Circulars { command } => run_circulars(&client, command)?,
        Commands::Grievances { command } => run_grievances(&client, command)?,
        Commands::Contacts { command } => run_contacts(&client, command)?,
        Commands::Resumes { command } => run_resumes(&client, command)?,
        Commands::Roles { command } => run_roles(&client, command)?,
    }

    Ok(())
}

fn run_circulars(client: &ApiClient, command: CircularCommands) -> Result<()> {
    match command {
        CircularCommands::List(args) => list_page(client.list_circulars()?, &args),

        CircularCommands::Show { id } => {
            let circular = find_record(client.list_circulars()?, id)?;
            println!("Circular #{}", circular.id);
            println!("Number: {}", circular.circular_no);
            println!("Subject: {}", circular.subject);
            println!("Date: {}", circular.date);
            if !circular.description.is_empty() {
                println!("\n{}", circular.description);
            }
            describe_attachment(client, circular.attachments());
            Ok(())
        }

        CircularCommands::Add { number, subject, description, date, file } => {
            let upload = file.as_deref().map(FileUpload::read).transpose()?;
            let outcome = client.add_circular(&number, &subject, &description, &date, upload)?;
            report(outcome, "Circular added");
            refresh_count(client.list_circulars()?, "Circulars");
            Ok(())
        }

        CircularCommands::Edit { id, number, subject, description, date, file } => {
            let circular = find_record(client.list_circulars()?, id)?;
            let server_id = require_server_id(&circular)?;
            let upload = file.as_deref().map(FileUpload::read).transpose()?;
            let outcome =
                client.update_circular(server_id, &number, &subject, &description, &date, upload)?;
            report(outcome, "Circular updated");
            refresh_count(client.list_circulars()?, "Circulars");
            Ok(())
        }

        CircularCommands::Delete { id, yes } => {
            let circular = find_record(client.list_circulars()?, id)?;
            let server_id = require_server_id(&circular)?;
            if !confirm_delete(yes)? {
                println!("Aborted.");
                return Ok(());
            }
            let outcome = client.delete_circular(server_id)?;
            report(outcome, "Circular deleted");
            refresh_count(client.list_circulars()?, "Circulars");
            Ok(())
        }

        CircularCommands::Open { id } => {
            let circular = find_record(client.list_circulars()?, id)?;
            open_attachment(client, circular.attachments())
        }

        CircularCommands::Export(args) => export_records(client.list_circulars()?, &args),
    }
}

fn run_grievances(client: &ApiClient, command: GrievanceCommands) -> Result<()> {
    match command {
        GrievanceCommands::List(args) => list_page(client.list_grievances()?, &args),

        GrievanceCommands::Show { id } => {
            let grievance = find_record(client.list_grievances()?, id)?;
            println!("Grievance #{}", grievance.id);
            println!("Title: {}", grievance.title);
            println!("Status: {} ({})", grievance.status, status_badge(&grievance.status));
            println!("Submitted by: {}", grievance.submitted_by);
            println!("Submitted on: {}", grievance.submitted_date);
            println!("Last updated: {}", grievance.last_updated);
            if !grievance.description.is_empty() {
                println!("\n{}", grievance.description);
            }
            describe_attachment(client, grievance.attachments());
            Ok(())
        }

        GrievanceCommands::SetStatus { id, status } => {
            let target = GrievanceStatus::parse(&status).ok_or_else(|| {
                anyhow!("Unknown status '{}'. Available: active, pending, closed", status)
            })?;
            let grievance = find_record(client.list_grievances()?, id)?;
            let server_id = require_server_id(&grievance)?;

            let mut controller = TransitionController::new(client);
            controller.open_details(grievance);
            let result = controller.transition(server_id, target)?;
            report(
                result.outcome,
                &format!("Grievance #{} moved to {}", id, target.as_str()),
            );
            for line in Grievance::summary_lines(&result.records) {
                println!("  {}", line);
            }
            Ok(())
        }

        GrievanceCommands::Hide { id } => {
            let mut records = client.list_grievances()?.into_records();
            if !workflow::hide_locally(&mut records, id) {
                bail!("Grievance #{} not found", id);
            }
            println!(
                "Grievance #{} hidden from this listing. The backend has no delete \
                 endpoint, so it will reappear on the next fetch.",
                id
            );
            let query = ListQuery::default();
            render_table(&view(&records, &query), &query);
            Ok(())
        }

        GrievanceCommands::Export(args) => export_records(client.list_grievances()?, &args),
    }
}

fn run_contacts(client: &ApiClient, command: ContactCommands) -> Result<()> {
    match command {
        ContactCommands::List(args) => list_page(client.list_contacts()?, &args),

        ContactCommands::Add { department, name, contact, email, address } => {
            let outcome = client.add_contact(&department, &name, &contact, &email, &address)?;
            report(outcome, "Contact added");
            refresh_count(client.list_contacts()?, "Contacts");
            Ok(())
        }

        ContactCommands::Edit { id, department, name, contact, email, address } => {
            let existing = find_record(client.list_contacts()?, id)?;
            let server_id = require_server_id(&existing)?;
            let outcome =
                client.update_contact(server_id, &department, &name, &contact, &email, &address)?;
            report(outcome, "Contact updated");
            refresh_count(client.list_contacts()?, "Contacts");
            Ok(())
        }

        ContactCommands::Delete { id, yes } => {
            let existing = find_record(client.list_contacts()?, id)?;
            let server_id = require_server_id(&existing)?;
            if !confirm_delete(yes)? {
                println!("Aborted.");
                return Ok(());
            }
            let outcome = client.delete_contact(server_id)?;
            report(outcome, "Contact deleted");
            refresh_count(client.list_contacts()?, "Contacts");
            Ok(())
        }

        ContactCommands::Export(args) => export_records(client.list_contacts()?, &args),
    }
}

fn run_resumes(client: &ApiClient, command: ResumeCommands) -> Result<()> {
    match command {
        ResumeCommands::List(args) => list_page(client.list_resumes()?, &args),

        ResumeCommands::Show { id } => {
            let resume = find_record(client.list_resumes()?, id)?;
            println!("Resume #{}", resume.id);
            println!("Name: {}", resume.name);
            println!("Contact: {}", resume.contact_no);
            println!("Email: {}", resume.email);
            println!("Qualification: {}", resume.qualification);
            if !resume.skills.is_empty() {
                println!("Skills: {}", resume.skills);
            }
            println!("Experience: {}", resume.experience);
            println!("Uploaded on: {}", resume.uploaded_on);
            describe_attachment(client, resume.attachments());
            Ok(())
        }

        ResumeCommands::Upload { name, contact, email, qualification, skills, experience, file } => {
            let upload = FileUpload::read(&file)?;
            let outcome = client.upload_resume(
                &name,
                &contact,
                &email,
                &qualification,
                &skills,
                &experience,
                upload,
            )?;
            report(outcome, "Resume uploaded");
            refresh_count(client.list_resumes()?, "Resumes");
            Ok(())
        }

        ResumeCommands::Delete { id, yes } => {
            let resume = find_record(client.list_resumes()?, id)?;
            let server_id = require_server_id(&resume)?;
            if !confirm_delete(yes)? {
                println!("Aborted.");
                return Ok(());
            }
            let outcome = client.delete_resume(server_id)?;
            report(outcome, "Resume deleted");
            refresh_count(client.list_resumes()?, "Resumes");
            Ok(())
        }

        ResumeCommands::Open { id } => {
            let resume = find_record(client.list_resumes()?, id)?;
            open_attachment(client, resume.attachments())
        }

        ResumeCommands::Export(args) => export_records(client.list_resumes()?, &args),
    }
}

fn run_roles(client: &ApiClient, command: RoleCommands) -> Result<()> {
    match command {
        RoleCommands::List(args) => list_page(client.list_roles()?, &args),

        RoleCommands::Add { name } => {
            let outcome = client.add_role(&name)?;
            report(outcome, "Role added");
            refresh_count(client.list_roles()?, "Roles");
            Ok(())
        }

        RoleCommands::Rename { id, name } => {
            let role = find_record(client.list_roles()?, id)?;
            let server_id = require_server_id(&role)?;
            let outcome = client.rename_role(server_id, &name)?;
            report(outcome, "Role renamed");
            refresh_count(client.list_roles()?, "Roles");
            Ok(())
        }

        RoleCommands::Delete { id, yes } => {
            let role = find_record(client.list_roles()?, id)?;
            let server_id = require_server_id(&role)?;
            if !confirm_delete(yes)? {
                println!("Aborted.");
                return Ok(());
            }
            let outcome = client.delete_role(server_id)?;
            report(outcome, "Role deleted");
            refresh_count(client.list_roles()?, "Roles");
            Ok(())
        }

        RoleCommands::Export(args) => export_records(client.list_roles()?, &args),
    }
}

fn list_page<R: Record>(normalized: Normalized<R>, args: &ListArgs) -> Result<()> {
    let Normalized::Records(records) = normalized else {
        println!("No records found.");
        return Ok(());
    };
    let query = args.to_query::<R>()?;
    let page = view(&records, &query);
    render_table(&page, &query);
    Ok(())
}

fn render_table<R: Record>(page: &PageView<R>, query: &ListQuery) {
    if page.records.is_empty() {
        println!("No records found.");
        return;
    }

    let widths: Vec<usize> = R::COLUMN_WIDTHS
        .iter()
        .map(|w| ((*w / 2.0) as usize).clamp(6, 40))
        .collect();

    let mut header = format!("{:<8}", "ID");
    for (name, width) in R::HEADERS.iter().skip(1).zip(widths.iter().skip(1)) {
        header.push_str(&format!("{:<width$}", name, width = width + 2));
    }
    println!("{}", header);
    println!("{}", "-".repeat(header.trim_end().len()));

    for record in &page.records {
        let id = if record.synthetic_id() {
            format!("{}*", record.id())
        } else {
            record.id().to_string()
        };
        let mut line = format!("{:<8}", id);
        for (cell, width) in record.export_row().iter().zip(widths.iter().skip(1)) {
            line.push_str(&format!("{:<width$}", truncate(cell, *width), width = width + 2));
        }
        println!("{}", line.trim_end());
    }

    println!();
    println!(
        "Showing {} to {} of {} entries (page {} of {})",
        page.first_index,
        page.last_index,
        page.total_count,
        query.page.min(page.total_pages),
        page.total_pages
    );
    if page.records.iter().any(|r| r.synthetic_id()) {
        println!("* id assigned locally; not usable for edit or delete");
    }
}

fn export_records<R: Record>(normalized: Normalized<R>, args: &ExportArgs) -> Result<()> {
    let format = ExportFormat::parse(&args.format).ok_or_else(|| {
        anyhow!("Unknown format '{}'. Available: clipboard, csv, xlsx, pdf", args.format)
    })?;

    let records = normalized.into_records();
    let mut query = ListQuery::default();
    query.set_search(&args.search);
    if let Some(sort) = &args.sort {
        if !R::SORT_KEYS.contains(&sort.as_str()) {
            bail!("Unknown sort column '{}'. Available: {}", sort, R::SORT_KEYS.join(", "));
        }
        query.sort_key = Some(sort.clone());
    } else {
        query.sort_key = R::DEFAULT_SORT.map(String::from);
    }
    query.sort_dir = if args.desc { SortDir::Desc } else { SortDir::Asc };

    // Export covers every record matching the filter, not just one page.
    let filtered = filter_sort(&records, &query);

    match format {
        ExportFormat::Clipboard => {
            export::copy_to_clipboard(&export::clipboard_text(&filtered))?;
            println!("Copied {} record(s) to the clipboard.", filtered.len());
        }
        ExportFormat::Csv => {
            let path = output_path::<R>(args, format);
            export::write_csv(&filtered, &path)?;
            println!("Wrote {} record(s) to {}", filtered.len(), path.display());
        }
        ExportFormat::Xlsx => {
            let path = output_path::<R>(args, format);
            export::write_workbook(&filtered, &path)?;
            println!("Wrote {} record(s) to {}", filtered.len(), path.display());
        }
        ExportFormat::Pdf => {
            let path = output_path::<R>(args, format);
            export::write_pdf(&filtered, &path)?;
            println!("Wrote {} record(s) to {}", filtered.len(), path.display());
        }
    }
    Ok(())
}

fn output_path<R: Record>(args: &ExportArgs, format: ExportFormat) -> PathBuf {
    args.out
        .clone()
        .unwrap_or_else(|| PathBuf::from(format.default_filename(R::LABEL)))
}

fn find_record<R: Record>(normalized: Normalized<R>, id: i64) -> Result<R> {
    normalized
        .into_records()
        .into_iter()
        .find(|record| record.id() == id)
        .ok_or_else(|| anyhow!("Record #{} not found", id))
}

/// Synthetic ids exist only for display; refusing them here keeps them from
/// ever reaching a mutation endpoint.
fn require_server_id<R: Record>(record: &R) -> Result<i64> {
    if record.synthetic_id() {
        bail!(
            "Record #{} has no server-assigned id and cannot be modified. \
             Refresh the list or fix the backend record.",
            record.id()
        );
    }
    Ok(record.id())
}

fn report(outcome: MutationOutcome, action: &str) {
    match outcome {
        MutationOutcome::Completed => println!("{}.", action),
        MutationOutcome::CompletedWithWarning(warning) => {
            println!("{}. Warning: {}", action, warning);
        }
    }
}

fn refresh_count<R: Record>(normalized: Normalized<R>, label: &str) {
    println!("{} now on record: {}", label, normalized.into_records().len());
}

fn confirm_delete(yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    print!("This cannot be undone. Type 'delete' to confirm: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("delete"))
}

fn confirm_download(filename: &std::path::Path) -> Result<bool> {
    print!("Download {}? [y/N] ", filename.display());
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("y"))
}

fn describe_attachment(client: &ApiClient, attachments: &[String]) {
    match files::resolve(attachments, client.config()) {
        Some(resolved) if resolved.extension.is_empty() => {
            println!("\nAttachment: {}", resolved.url)
        }
        Some(resolved) => println!("\nAttachment ({}): {}", resolved.extension, resolved.url),
        None => println!("\nNo attachment."),
    }
}

fn open_attachment(client: &ApiClient, attachments: &[String]) -> Result<()> {
    let Some(resolved) = files::resolve(attachments, client.config()) else {
        println!("No attachment on this record.");
        return Ok(());
    };

    match resolved.action {
        FileAction::InlinePreview | FileAction::OpenTab => {
            files::fetch_and_open(client, &resolved);
            Ok(())
        }
        FileAction::ConfirmDownload => {
            if !confirm_download(&files::staging_hint(&resolved))? {
                println!("Aborted.");
                return Ok(());
            }
            let dest = files::download_to(client, &resolved, None)?;
            println!("Saved to {}", dest.display());
            Ok(())
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
