mod config;
mod domain;
mod events;
mod notifications;
mod persistence;
mod player;
mod report;
mod scheduler;
mod ticker;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use clap::{Args, Parser, Subcommand};
use config::{load_config, save_config, AppConfig};
use domain::{
    format_time_of_day, parse_time_of_day, parse_weekdays, timeline_row,
    TaskTemplate, TaskType, TaskTypeCatalog,
};
use events::SchedulerEvent;
use notifications::ReminderQueue;
use persistence::{config_file, ensure_data_dir, get_data_dir, init_local_data_dir, save_file, JsonFileStore};
use player::PlayerStats;
use scheduler::{Scheduler, SchedulerDeps};
use signal_hook::consts::{SIGINT, SIGTERM};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use ticker::SystemClock;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "weekline")]
#[command(about = "A weekly life-organizer timeline with recurring tasks and stat rewards", long_about = None)]
struct Cli {
    /// Data directory to use instead of the discovered .weekline
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a local .weekline directory in the current directory
    Init,
    /// Show a day's timeline (today by default)
    List {
        /// Weekday to show, e.g. "mon"
        #[arg(short, long)]
        day: Option<String>,
    },
    /// Add a recurring task
    Add(NewTaskArgs),
    /// Change an existing task; omitted fields keep their value
    Update {
        /// Task id or unique id prefix
        id: String,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Remove a task
    Remove {
        /// Task id or unique id prefix
        id: String,
    },
    /// Show the current task, or the next one coming up
    Next,
    /// Confirm today's instance of a task
    Complete {
        /// Task id or unique id prefix
        id: String,
    },
    /// Give up on today's instance of a task
    Fail {
        /// Task id or unique id prefix
        id: String,
    },
    /// Show player stats
    Stats,
    /// Generate a daily report with statistics
    Report {
        /// Date to generate report for (YYYY-MM-DD format). Defaults to today.
        #[arg(short, long)]
        date: Option<String>,
        /// Output file path. Defaults to <data dir>/report-YYYY-MM-DD.md
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Track tasks in the foreground until interrupted
    Run,
    /// Delete all saved tasks, history and stats
    Reset {
        /// Required to actually delete anything
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args)]
struct NewTaskArgs {
    #[arg(long)]
    name: String,
    /// exercise, sleep, rest, eating, work, housework, creative, hygiene
    #[arg(long = "type")]
    task_type: String,
    /// Comma-separated days, "weekdays", "weekend" or "all"
    #[arg(long)]
    days: String,
    /// Start time, HH:MM
    #[arg(long)]
    start: String,
    /// End time, HH:MM (24:00 for midnight)
    #[arg(long)]
    end: String,
    #[arg(long)]
    color: Option<String>,
}

#[derive(Args)]
struct TaskFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long = "type")]
    task_type: Option<String>,
    #[arg(long)]
    days: Option<String>,
    #[arg(long)]
    start: Option<String>,
    #[arg(long)]
    end: Option<String>,
    #[arg(long)]
    color: Option<String>,
}

/// Scheduler plus the collaborators the CLI reads back
struct Session {
    scheduler: Scheduler,
    player: Rc<RefCell<PlayerStats>>,
    data_dir: PathBuf,
    config: AppConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(matches!(cli.command, Some(Commands::Run)));

    match cli.command {
        Some(Commands::Init) => {
            let current_dir = std::env::current_dir().context("Could not determine current directory")?;
            let data_dir = init_local_data_dir(&current_dir)?;
            save_config(&config_file(&data_dir), &AppConfig::default())?;
            println!("Initialized weekline directory: {}", data_dir.display());
            println!();
            println!("Weekline will now use this local directory for its data.");
            println!("Run 'weekline list' to see today's timeline.");
            Ok(())
        }
        Some(Commands::Reset { yes }) => {
            let data_dir = resolve_data_dir(cli.data_dir)?;
            let mut store = JsonFileStore::new(save_file(&data_dir));
            if !yes {
                bail!("This deletes {}. Re-run with --yes to confirm.", store.path().display());
            }
            store.clear()?;
            println!("Deleted {}", store.path().display());
            Ok(())
        }
        command => {
            let data_dir = resolve_data_dir(cli.data_dir)?;
            let desktop = matches!(command, Some(Commands::Run));
            let mut session = open_session(data_dir, desktop)?;
            let result = run_command(&mut session, command.unwrap_or(Commands::List { day: None }));
            session.scheduler.shutdown();
            result
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    let dir = match explicit {
        Some(dir) => dir,
        None => get_data_dir()?,
    };
    ensure_data_dir(&dir)
}

fn open_session(data_dir: PathBuf, desktop: bool) -> Result<Session> {
    let config = load_config(&config_file(&data_dir))?;
    let store = JsonFileStore::new(save_file(&data_dir));
    let player = Rc::new(RefCell::new(PlayerStats::load(Box::new(store.clone()))));

    let deps = SchedulerDeps {
        store: Box::new(store),
        rewards: Box::new(Rc::clone(&player)),
        notifier: Box::new(ReminderQueue::new(desktop)),
        clock: Box::new(SystemClock),
        catalog: TaskTypeCatalog::default(),
    };
    let mut scheduler = Scheduler::new(deps, config.clone());
    if scheduler.initialize() {
        println!("Welcome! Using data directory {}", data_dir.display());
    }
    scheduler.tick();

    Ok(Session {
        scheduler,
        player,
        data_dir,
        config,
    })
}

fn run_command(session: &mut Session, command: Commands) -> Result<()> {
    match command {
        Commands::List { day } => {
            let weekday = match day {
                Some(day) => parse_day(&day)?,
                None => session.scheduler.today().weekday(),
            };
            print_day(&session.scheduler, weekday);
        }
        Commands::Add(args) => {
            let template = new_template(args)?;
            session
                .scheduler
                .check_template(&template, None)
                .map_err(|e| anyhow!("Cannot add '{}': {}", template.name, e))?;
            let id = template.id.clone();
            if !session.scheduler.add_task(template) {
                bail!("Task was not added");
            }
            println!("Added task {}", id);
        }
        Commands::Update { id, fields } => {
            let id = resolve_template_id(&session.scheduler, &id)?;
            let current = session
                .scheduler
                .templates()
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or_else(|| anyhow!("No task with id {}", id))?;
            let updated = apply_fields(current, fields)?;
            session
                .scheduler
                .check_template(&updated, Some(&id))
                .map_err(|e| anyhow!("Cannot update '{}': {}", updated.name, e))?;
            if !session.scheduler.update_task(updated) {
                bail!("Task was not updated");
            }
            println!("Updated task {}", id);
        }
        Commands::Remove { id } => {
            let id = resolve_template_id(&session.scheduler, &id)?;
            session.scheduler.remove_task(&id);
            println!("Removed task {}", id);
        }
        Commands::Next => match session.scheduler.current_or_next_task() {
            Some(instance) if instance.status.is_active() => {
                println!("Now: {}", timeline_row(instance));
            }
            Some(instance) => println!("Next: {}", timeline_row(instance)),
            None => println!("Nothing scheduled in the coming week."),
        },
        Commands::Complete { id } => {
            let instance_id = today_instance_id(&session.scheduler, &id)?;
            if !session.scheduler.complete_task(instance_id) {
                bail!("Only a task in progress or awaiting confirmation can be completed");
            }
            print_resolved(session, instance_id);
        }
        Commands::Fail { id } => {
            let instance_id = today_instance_id(&session.scheduler, &id)?;
            if !session.scheduler.fail_task(instance_id) {
                bail!("This task is already resolved for today");
            }
            print_resolved(session, instance_id);
        }
        Commands::Stats => print_stats(&session.player.borrow()),
        Commands::Report { date, output } => {
            let report_date = match date {
                Some(date_str) => NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                    .map_err(|e| anyhow!("Invalid date format. Use YYYY-MM-DD: {}", e))?,
                None => session.scheduler.today(),
            };
            let output_path = output.map(PathBuf::from);

            println!("Generating report for {}...", report_date);
            let report_path = write_report(session, report_date, output_path)?;
            println!("Report generated: {}", report_path.display());
        }
        Commands::Run => run_loop(session)?,
        Commands::Init | Commands::Reset { .. } => bail!("This command does not run inside a session"),
    }
    Ok(())
}

fn write_report(session: &Session, date: NaiveDate, output: Option<PathBuf>) -> Result<PathBuf> {
    report::generate_report(
        &session.data_dir,
        session.scheduler.templates(),
        session.scheduler.history(),
        session.scheduler.catalog(),
        date,
        output,
    )
}

/// Tick until Ctrl-C; writes a report for each day that ends meanwhile
fn run_loop(session: &mut Session) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&stop))
            .context("Failed to install signal handler")?;
    }

    let subscription = session.scheduler.subscribe(|event| {
        if let SchedulerEvent::TaskStateChanged { template_id, status, .. } = event {
            info!(task = %template_id, status = status.to_tag(), "task state changed");
        }
    });

    info!(
        tick_ms = session.config.tick_ms,
        data_dir = %session.data_dir.display(),
        "tracking tasks, press Ctrl-C to stop"
    );
    let tick_rate = session.config.tick_interval();
    let mut tracked_date = session.scheduler.today();

    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(tick_rate);
        session.scheduler.tick();

        let today = session.scheduler.today();
        if today != tracked_date {
            // Report for the day that just passed
            match write_report(session, tracked_date, None) {
                Ok(path) => info!(path = %path.display(), "generated report for {}", tracked_date),
                Err(e) => warn!(error = %e, "failed to generate report for {}", tracked_date),
            }
            tracked_date = today;
        }
    }

    session.scheduler.unsubscribe(subscription);
    info!("stopping");
    Ok(())
}

fn print_day(scheduler: &Scheduler, weekday: Weekday) {
    let instances = scheduler.tasks_for_day(weekday);
    let marker = if weekday == scheduler.today().weekday() { " (today)" } else { "" };
    println!("{}{}", weekday_name(weekday), marker);
    if instances.iter().all(|t| t.is_free_time()) {
        println!("  No tasks scheduled.");
    }
    for instance in instances {
        println!("  {}", timeline_row(instance));
    }
}

fn print_resolved(session: &Session, instance_id: uuid::Uuid) {
    if let Some(instance) = session.scheduler.instance(instance_id) {
        println!("{}", timeline_row(instance));
        let trigger = session
            .scheduler
            .catalog()
            .definition(instance.template.task_type)
            .and_then(|d| d.animation_trigger);
        if let Some(trigger) = trigger {
            println!("  Avatar: {trigger}");
        }
    }
    print_stats(&session.player.borrow());
}

fn print_stats(player: &PlayerStats) {
    let data = player.data();
    println!("{} - level {} ({}/{} XP)", data.player_name, data.level, data.current_xp, data.xp_to_next_level);
    println!("  Strength:     {}/{}", data.strength, data.max_stat_value);
    println!("  Intelligence: {}/{}", data.intelligence, data.max_stat_value);
    println!("  Health:       {}/{}", data.health, data.max_stat_value);
    println!("  Mood:         {}", player.avatar_state().name());
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn parse_day(input: &str) -> Result<Weekday> {
    input
        .trim()
        .parse::<Weekday>()
        .map_err(|_| anyhow!("Invalid day '{}'. Use mon, tue, ... sun", input))
}

fn parse_days(input: &str) -> Result<Vec<Weekday>> {
    parse_weekdays(input).ok_or_else(|| anyhow!("Invalid days '{}'. Use e.g. mon,wed or weekdays", input))
}

fn parse_type(input: &str) -> Result<TaskType> {
    TaskType::from_tag(input).ok_or_else(|| {
        let tags: Vec<_> = TaskType::all().iter().map(|t| t.to_tag()).collect();
        anyhow!("Invalid type '{}'. Use one of: {}", input, tags.join(", "))
    })
}

fn parse_time(input: &str) -> Result<Duration> {
    parse_time_of_day(input).ok_or_else(|| anyhow!("Invalid time '{}'. Use HH:MM", input))
}

fn window(start: &str, end: &str) -> Result<(Duration, Duration)> {
    let start = parse_time(start)?;
    let end = parse_time(end)?;
    if end <= start {
        bail!(
            "End {} must be after start {}",
            format_time_of_day(end),
            format_time_of_day(start)
        );
    }
    Ok((start, end - start))
}

fn new_template(args: NewTaskArgs) -> Result<TaskTemplate> {
    let (start, duration) = window(&args.start, &args.end)?;
    let mut template = TaskTemplate::new(
        args.name,
        parse_type(&args.task_type)?,
        parse_days(&args.days)?,
        start,
        duration,
    );
    if let Some(color) = args.color {
        template.color = color;
    }
    Ok(template)
}

fn apply_fields(mut template: TaskTemplate, fields: TaskFields) -> Result<TaskTemplate> {
    if let Some(name) = fields.name {
        template.name = name;
    }
    if let Some(task_type) = fields.task_type {
        template.task_type = parse_type(&task_type)?;
    }
    if let Some(days) = fields.days {
        template.recurrence_days = parse_days(&days)?;
    }
    if let Some(color) = fields.color {
        template.color = color;
    }
    if fields.start.is_some() || fields.end.is_some() {
        let start = fields
            .start
            .unwrap_or_else(|| format_time_of_day(template.start_time_of_day));
        let end = fields
            .end
            .unwrap_or_else(|| format_time_of_day(template.end_time_of_day()));
        let (start, duration) = window(&start, &end)?;
        template.start_time_of_day = start;
        template.duration = duration;
    }
    Ok(template)
}

/// Match a full id or a unique prefix
fn resolve_template_id(scheduler: &Scheduler, input: &str) -> Result<String> {
    let matches: Vec<&TaskTemplate> = scheduler
        .templates()
        .iter()
        .filter(|t| t.id.starts_with(input))
        .collect();
    match matches.as_slice() {
        [] => bail!("No task with id {}", input),
        [template] => Ok(template.id.clone()),
        many if many.iter().any(|t| t.id == input) => Ok(input.to_string()),
        many => bail!("Id prefix '{}' matches {} tasks", input, many.len()),
    }
}

fn today_instance_id(scheduler: &Scheduler, input: &str) -> Result<uuid::Uuid> {
    let id = resolve_template_id(scheduler, input)?;
    scheduler
        .find_today_instance(&id)
        .map(|instance| instance.id)
        .ok_or_else(|| anyhow!("Task {} is not scheduled today", id))
}
