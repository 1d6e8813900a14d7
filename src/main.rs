use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use render_queue::model::{JobId, NewJob, NewWorker, TaskReport, WorkerId};
use render_queue::scheduler::ClaimedTask;
use render_queue::shutdown::install_shutdown_handler;
use render_queue::store::TaskView;
use render_queue::worker::TaskPoller;
use render_queue::{QueueConfig, RenderQueue};

#[derive(Parser, Debug)]
#[command(name = "render-queue")]
#[command(version)]
#[command(about = "A render farm queue shared through a directory tree")]
#[command(propagate_version = true)]
struct Args {
    /// Root directory of the shared queue
    #[arg(long, env = "RENDER_QUEUE_ROOT", default_value = "queue", global = true)]
    root: PathBuf,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Job management commands
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Task state and editing commands
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Worker management commands
    Worker {
        #[command(subcommand)]
        command: WorkerCommands,
    },
}

// =============================================================================
// Job Commands
// =============================================================================

#[derive(clap::Subcommand, Debug)]
enum JobCommands {
    /// Submit a new job with one task per --frames value
    Submit {
        #[arg(long)]
        name: String,

        /// Job type, e.g. "Maya" or "Nuke"
        #[arg(long = "type")]
        job_type: String,

        /// Priority from 0 (lowest) to 100
        #[arg(long, default_value = "50", allow_hyphen_values = true)]
        priority: i64,

        /// Frame set for one task, e.g. "1-10" (repeatable)
        #[arg(long, required = true)]
        frames: Vec<String>,

        /// Extra job parameter as key=value; JSON values are kept typed (repeatable)
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, serde_json::Value)>,
    },
    /// List all jobs
    List,
    /// Show a job record
    Show { job_id: JobId },
    /// List a job's tasks and their states
    Tasks { job_id: JobId },
    /// Show or change a job's priority
    Priority {
        job_id: JobId,
        #[arg(allow_hyphen_values = true)]
        value: Option<i64>,
    },
    /// Delete a job and all of its tasks
    Delete { job_id: JobId },
    /// Requeue every task of a job that is not already queued
    Requeue { job_id: JobId },
    /// Archive a job
    Archive { job_id: JobId },
}

// =============================================================================
// Task Commands
// =============================================================================

#[derive(clap::Subcommand, Debug)]
enum TaskCommands {
    /// Mark a task completed
    Complete {
        job_id: JobId,
        task_no: u32,
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Mark a task failed
    Fail {
        job_id: JobId,
        task_no: u32,
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Put a task back in the queue
    Requeue { job_id: JobId, task_no: u32 },
    /// Combine queued tasks with contiguous frames into the first one
    Combine {
        job_id: JobId,
        #[arg(num_args = 2.., required = true)]
        task_nos: Vec<u32>,
    },
    /// Split a queued task into several tasks
    Split {
        job_id: JobId,
        task_no: u32,
        parts: usize,
    },
}

#[derive(clap::Args, Debug)]
struct ReportArgs {
    /// Worker that rendered the task
    #[arg(long)]
    worker: Option<String>,

    /// Render time in seconds
    #[arg(long = "time", value_parser = parse_seconds)]
    elapsed: Option<Duration>,
}

impl From<ReportArgs> for TaskReport {
    fn from(args: ReportArgs) -> Self {
        TaskReport {
            worker: args.worker,
            elapsed: args.elapsed,
        }
    }
}

// =============================================================================
// Worker Commands
// =============================================================================

#[derive(clap::Subcommand, Debug)]
enum WorkerCommands {
    /// Register a new worker
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        hostname: Option<String>,
    },
    /// List registered workers
    List,
    /// Deregister a worker
    Delete {
        worker_id: WorkerId,
        /// Requeue the worker's claimed tasks before deleting it
        #[arg(long)]
        rescue: bool,
    },
    /// Show or change a worker's status
    Status {
        worker_id: WorkerId,
        value: Option<String>,
    },
    /// Claim the next task for a worker, if there is one
    Next { worker_id: WorkerId },
    /// Poll until a task is claimed or a shutdown signal arrives
    Wait {
        worker_id: WorkerId,
        /// Poll interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

// =============================================================================
// JSON Output Types
// =============================================================================

#[derive(Serialize)]
struct JobSubmitOutput {
    job_id: String,
}

#[derive(Serialize)]
struct TaskOutput {
    task_no: u32,
    status: &'static str,
    worker: Option<String>,
    frames: String,
}

impl From<&TaskView> for TaskOutput {
    fn from(view: &TaskView) -> Self {
        TaskOutput {
            task_no: view.record.task_no,
            status: view.status(),
            worker: view.state.worker().map(ToString::to_string),
            frames: view.record.frames.clone(),
        }
    }
}

#[derive(Serialize)]
struct ClaimedOutput {
    job_id: String,
    job_name: String,
    job_type: String,
    task_no: u32,
    frames: String,
}

impl From<&ClaimedTask> for ClaimedOutput {
    fn from(claimed: &ClaimedTask) -> Self {
        ClaimedOutput {
            job_id: claimed.job_id().to_string(),
            job_name: claimed.job.name.clone(),
            job_type: claimed.job.job_type.clone(),
            task_no: claimed.task_no(),
            frames: claimed.frames().to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChangeOutput {
    changed: bool,
}

#[derive(Serialize)]
struct JobDeleteOutput {
    job_id: String,
    removed_tasks: usize,
    in_flight: Vec<InFlightOutput>,
}

#[derive(Serialize)]
struct InFlightOutput {
    task_no: u32,
    worker_id: String,
}

#[derive(Serialize)]
struct RescuedOutput {
    job_id: String,
    task_no: u32,
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_param(s: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty parameter name in '{}'", s));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|_| format!("invalid number of seconds '{}'", s))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration '{}': {}", s, e))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_change(changed: bool, output: OutputFormat, what: &str) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        OutputFormat::Json => print_json(&ChangeOutput { changed }),
        OutputFormat::Table => {
            if changed {
                println!("{} updated.", what);
            } else {
                println!("{} unchanged.", what);
            }
            Ok(())
        }
    }
}

fn print_claimed(
    claimed: Option<&ClaimedTask>,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        OutputFormat::Json => print_json(&claimed.map(ClaimedOutput::from)),
        OutputFormat::Table => {
            match claimed {
                Some(claimed) => {
                    println!("Job ID:   {}", claimed.job_id());
                    println!("Job Name: {}", claimed.job.name);
                    println!("Job Type: {}", claimed.job.job_type);
                    println!("Task:     {}", claimed.task_no());
                    println!("Frames:   {}", claimed.frames());
                }
                None => println!("No work available."),
            }
            Ok(())
        }
    }
}

// =============================================================================
// Command Handlers
// =============================================================================

fn handle_job(
    queue: &RenderQueue,
    command: JobCommands,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        JobCommands::Submit {
            name,
            job_type,
            priority,
            frames,
            params,
        } => {
            let mut new = NewJob::new(name, job_type).with_priority(priority);
            for frames in frames {
                new = new.with_task(frames);
            }
            for (key, value) in params {
                new = new.with_param(key, value);
            }
            let job_id = queue.create_job(new)?;
            match output {
                OutputFormat::Json => print_json(&JobSubmitOutput {
                    job_id: job_id.to_string(),
                })?,
                OutputFormat::Table => {
                    println!("Job submitted successfully!");
                    println!("Job ID: {}", job_id);
                }
            }
        }
        JobCommands::List => {
            let mut jobs = queue.list_jobs()?;
            jobs.sort_by(render_queue::scheduler::schedule_order);
            match output {
                OutputFormat::Json => print_json(&jobs)?,
                OutputFormat::Table => {
                    if jobs.is_empty() {
                        println!("No jobs found.");
                        return Ok(());
                    }
                    println!("{:<34} {:>4} {:>6} {:<12} NAME", "JOB ID", "PRI", "QUEUED", "TYPE");
                    println!("{}", "-".repeat(78));
                    for job in &jobs {
                        let queued = queue.queued_tasks(&job.id)?.len();
                        println!(
                            "{:<34} {:>4} {:>6} {:<12} {}",
                            job.id, job.priority, queued, job.job_type, job.name
                        );
                    }
                }
            }
        }
        JobCommands::Show { job_id } => {
            let job = queue.read_job(&job_id)?;
            match output {
                OutputFormat::Json => print_json(&job)?,
                OutputFormat::Table => {
                    println!("Job ID:    {}", job.id);
                    println!("Name:      {}", job.name);
                    println!("Type:      {}", job.job_type);
                    println!("Priority:  {}", job.priority);
                    println!("Submitted: {}", job.submitted_at.to_rfc3339());
                    println!("Tasks:     {}", job.tasks.join(" | "));
                    for (key, value) in &job.params {
                        println!("  {} = {}", key, value);
                    }
                }
            }
        }
        JobCommands::Tasks { job_id } => {
            let tasks = queue.list_tasks(&job_id)?;
            match output {
                OutputFormat::Json => {
                    print_json(&tasks.iter().map(TaskOutput::from).collect::<Vec<_>>())?
                }
                OutputFormat::Table => {
                    if tasks.is_empty() {
                        println!("No tasks found.");
                        return Ok(());
                    }
                    println!("{:<6} {:<10} {:<34} FRAMES", "TASK", "STATUS", "WORKER");
                    println!("{}", "-".repeat(70));
                    for view in &tasks {
                        let task = TaskOutput::from(view);
                        println!(
                            "{:<6} {:<10} {:<34} {}",
                            task.task_no,
                            task.status,
                            task.worker.as_deref().unwrap_or("-"),
                            task.frames
                        );
                    }
                }
            }
        }
        JobCommands::Priority { job_id, value } => match value {
            Some(value) => {
                let changed = queue.set_job_priority(&job_id, value)?;
                print_change(changed, output, "Priority")?;
            }
            None => {
                let priority = queue.job_priority(&job_id)?;
                match output {
                    OutputFormat::Json => print_json(&priority)?,
                    OutputFormat::Table => println!("{}", priority),
                }
            }
        },
        JobCommands::Delete { job_id } => {
            let deletion = queue.delete_job(&job_id)?;
            match output {
                OutputFormat::Json => print_json(&JobDeleteOutput {
                    job_id: deletion.job_id.to_string(),
                    removed_tasks: deletion.removed_tasks,
                    in_flight: deletion
                        .in_flight
                        .iter()
                        .map(|(task_no, worker_id)| InFlightOutput {
                            task_no: *task_no,
                            worker_id: worker_id.to_string(),
                        })
                        .collect(),
                })?,
                OutputFormat::Table => {
                    println!("Deleted job {} ({} tasks).", deletion.job_id, deletion.removed_tasks);
                    for (task_no, worker_id) in &deletion.in_flight {
                        println!("  task {} was being rendered by worker {}", task_no, worker_id);
                    }
                }
            }
        }
        JobCommands::Requeue { job_id } => {
            let moved = queue.requeue_job(&job_id)?;
            match output {
                OutputFormat::Json => print_json(&moved)?,
                OutputFormat::Table => println!("Requeued {} tasks.", moved),
            }
        }
        JobCommands::Archive { job_id } => {
            queue.archive_job(&job_id)?;
        }
    }
    Ok(())
}

fn handle_task(
    queue: &RenderQueue,
    command: TaskCommands,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        TaskCommands::Complete {
            job_id,
            task_no,
            report,
        } => {
            let changed = queue.complete_task(&job_id, task_no, &report.into())?;
            print_change(changed, output, "Task")?;
        }
        TaskCommands::Fail {
            job_id,
            task_no,
            report,
        } => {
            let changed = queue.fail_task(&job_id, task_no, &report.into())?;
            print_change(changed, output, "Task")?;
        }
        TaskCommands::Requeue { job_id, task_no } => {
            let changed = queue.requeue_task(&job_id, task_no)?;
            print_change(changed, output, "Task")?;
        }
        TaskCommands::Combine { job_id, task_nos } => {
            let task_no = queue.combine_tasks(&job_id, &task_nos)?;
            match output {
                OutputFormat::Json => print_json(&task_no)?,
                OutputFormat::Table => println!("Combined into task {}.", task_no),
            }
        }
        TaskCommands::Split {
            job_id,
            task_no,
            parts,
        } => {
            let task_nos = queue.split_task(&job_id, task_no, parts)?;
            match output {
                OutputFormat::Json => print_json(&task_nos)?,
                OutputFormat::Table => {
                    let listed: Vec<String> = task_nos.iter().map(ToString::to_string).collect();
                    println!("Split into tasks {}.", listed.join(", "));
                }
            }
        }
    }
    Ok(())
}

async fn handle_worker(
    queue: Arc<RenderQueue>,
    command: WorkerCommands,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        WorkerCommands::Register { name, hostname } => {
            let mut new = NewWorker::new(name);
            if let Some(hostname) = hostname {
                new = new.with_hostname(hostname);
            }
            let worker_id = queue.create_worker(new)?;
            match output {
                OutputFormat::Json => print_json(&worker_id)?,
                OutputFormat::Table => {
                    println!("Worker registered.");
                    println!("Worker ID: {}", worker_id);
                }
            }
        }
        WorkerCommands::List => {
            let workers = queue.list_workers()?;
            match output {
                OutputFormat::Json => print_json(&workers)?,
                OutputFormat::Table => {
                    if workers.is_empty() {
                        println!("No workers registered.");
                        return Ok(());
                    }
                    println!("{:<34} {:<16} {:<20} STATUS", "WORKER ID", "NAME", "HOSTNAME");
                    println!("{}", "-".repeat(80));
                    for worker in &workers {
                        println!(
                            "{:<34} {:<16} {:<20} {}",
                            worker.id, worker.name, worker.hostname, worker.status
                        );
                    }
                }
            }
        }
        WorkerCommands::Delete { worker_id, rescue } => {
            let rescued = if rescue {
                queue.requeue_worker_tasks(&worker_id)?
            } else {
                Vec::new()
            };
            let removal = queue.delete_worker(&worker_id)?;
            match output {
                OutputFormat::Json => print_json(
                    &rescued
                        .iter()
                        .map(|(job_id, task_no)| RescuedOutput {
                            job_id: job_id.to_string(),
                            task_no: *task_no,
                        })
                        .collect::<Vec<_>>(),
                )?,
                OutputFormat::Table => {
                    println!("Deleted worker {}.", removal.worker_id);
                    for (job_id, task_no) in &rescued {
                        println!("  requeued job {} task {}", job_id, task_no);
                    }
                    for (job_id, task_no) in &removal.abandoned {
                        println!("  abandoned job {} task {}", job_id, task_no);
                    }
                }
            }
        }
        WorkerCommands::Status { worker_id, value } => match value {
            Some(value) => {
                let changed = queue.set_worker_status(&worker_id, &value)?;
                print_change(changed, output, "Status")?;
            }
            None => {
                let status = queue.worker_status(&worker_id)?;
                match output {
                    OutputFormat::Json => print_json(&status)?,
                    OutputFormat::Table => println!("{}", status),
                }
            }
        },
        WorkerCommands::Next { worker_id } => {
            let claimed = queue.dequeue_task(&worker_id)?;
            print_claimed(claimed.as_ref(), output)?;
        }
        WorkerCommands::Wait {
            worker_id,
            interval_ms,
        } => {
            let mut poller = TaskPoller::new(Arc::clone(&queue), worker_id);
            if let Some(interval_ms) = interval_ms {
                poller = poller.with_interval(Duration::from_millis(interval_ms));
            }
            let shutdown = install_shutdown_handler();
            let claimed = poller.next_task(&shutdown).await?;
            print_claimed(claimed.as_ref(), output)?;
        }
    }
    Ok(())
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let queue = Arc::new(RenderQueue::open(QueueConfig::new(args.root))?);

    match args.command {
        Commands::Job { command } => handle_job(&queue, command, args.output)?,
        Commands::Task { command } => handle_task(&queue, command, args.output)?,
        Commands::Worker { command } => handle_worker(queue, command, args.output).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so JSON output on stdout stays parseable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
