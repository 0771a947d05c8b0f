mod app;
mod backup;
mod cleanup;
mod cli;
mod completions;
mod config;
mod dispatch;
mod doctor;
mod domain;
mod init;
mod listing;
mod lock;
mod perf;
mod quota;
mod resources;
mod status;
mod storage;
mod store;
mod ui;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("error: {}", err);
        if err.is_quota_exceeded() {
            eprintln!(
                "hint: run 'tack archive', 'tack export', or delete posts to free space"
            );
        }
        std::process::exit(1);
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

#[allow(clippy::too_many_lines)]
fn run() -> Result<(), app::AppError> {
    use clap::Parser;
    use cli::Commands;

    let cli = cli::Cli::parse();

    if let Commands::Init = &cli.command {
        init::init_all(&cli.store_root)?;
        println!("tack init completed");
        return Ok(());
    }
    if let Commands::Uninit = &cli.command {
        init::uninit_all(&cli.store_root)?;
        println!("tack uninit completed");
        return Ok(());
    }
    if let Commands::Completions(args) = &cli.command {
        return run_completions(args);
    }

    let app = app::App::open(&cli.store_root)?;

    match cli.command {
        Commands::Project(command) => run_project(&app, command)?,
        Commands::Task(command) => run_task(&app, command)?,
        Commands::Post(command) => run_post(&app, command)?,
        Commands::Resource(command) => run_resource(&app, command)?,
        Commands::Status => {
            print_json(&app.status_view()?);
        }
        Commands::Doctor => {
            let report = doctor::run_doctor(&app)?;
            print_json(&report);
            if report.failure_count() > 0 {
                return Err(app::AppError::InvalidArgument(format!(
                    "{} doctor check(s) failed",
                    report.failure_count()
                )));
            }
        }
        Commands::Cleanup(args) => {
            let summary = app.run_cleanup(args.emergency)?;
            println!(
                "removed {} key(s), reclaimed {} byte(s)",
                summary.removed_keys.len(),
                summary.reclaimed_bytes
            );
        }
        Commands::Archive(args) => {
            let days = args.days.unwrap_or(app.config().archive_after_days);
            let summary = app.archive_old_projects(days)?;
            println!("archived {} project(s)", summary.archived);
        }
        Commands::Export(args) => {
            let document = app.export()?;
            let payload = serde_json::to_string_pretty(&document)
                .expect("json serialization should work");
            match args.out {
                Some(path) => {
                    std::fs::write(&path, payload)?;
                    println!("exported to {}", path.display());
                }
                None => println!("{payload}"),
            }
        }
        Commands::Import(args) => {
            if !args.yes {
                return Err(app::AppError::InvalidArgument(
                    "import overwrites stored collections; pass --yes to confirm".to_string(),
                ));
            }
            let raw = std::fs::read_to_string(&args.file)?;
            let document = backup::parse_document(&raw).map_err(app::AppError::from)?;
            let summary = app.import(&document)?;
            println!(
                "imported {} collection(s), skipped {}",
                summary.imported.len(),
                summary.skipped.len()
            );
        }
        Commands::Perf(args) => {
            let report = perf::run_perf_harness(&app, args.iterations)
                .map_err(|err| app::AppError::InvalidArgument(err.to_string()))?;
            print_json(&report);
            if report.over_budget_count() > 0 {
                eprintln!("{} measurement(s) over budget", report.over_budget_count());
            }
        }
        Commands::Init | Commands::Uninit | Commands::Completions(_) => {
            unreachable!("handled before the store is opened")
        }
    }
    Ok(())
}

fn run_completions(args: &cli::CompletionsArgs) -> Result<(), app::AppError> {
    let shell = match args.shell.as_deref() {
        Some(name) => completions::parse_shell(name).ok_or_else(|| {
            app::AppError::InvalidArgument(format!("unsupported shell '{name}'"))
        })?,
        None => completions::detect_current_shell().ok_or_else(|| {
            app::AppError::InvalidArgument(
                "could not detect the current shell; pass one explicitly".to_string(),
            )
        })?,
    };
    if args.install {
        let path = completions::install_completions(shell)?;
        println!("completions installed to {}", path.display());
    } else {
        completions::generate_completions(shell, &mut std::io::stdout());
    }
    Ok(())
}

fn run_project(
    app: &app::App,
    command: cli::ProjectCommands,
) -> Result<(), app::AppError> {
    use cli::ProjectCommands;
    match command {
        ProjectCommands::New(args) => {
            let project = app.create_project(domain::project::NewProject {
                owner: args.owner,
                title: args.title,
                description: args.desc,
                notes: args.notes,
                priority: dispatch::parse_priority(args.priority.as_deref())?,
                tags: args.tags,
                tech: args.tech,
                public: args.public,
            })?;
            println!("created {} {}", project.id, project.title);
        }
        ProjectCommands::Ls(args) => {
            let filter = listing::ProjectListFilter {
                include_archived: args.all,
                status: args.status,
                owner: args.owner,
                tag: args.tag,
                query: args.query,
            };
            let projects = listing::apply_project_filters(app.list_projects()?, &filter);
            if args.json {
                print_json(&projects);
            } else {
                ui::print_project_list(&projects, &filter);
            }
        }
        ProjectCommands::Show(args) => match app.show_project(&args.id)? {
            Some(project) => print_json(&project),
            None => return Err(app::AppError::NotFound(args.id)),
        },
        ProjectCommands::Update(args) => {
            let id = args.id.clone();
            match app.update_project(&id, dispatch::project_patch(args)?)? {
                Some(project) => println!("updated {}", project.id),
                None => return Err(app::AppError::NotFound(id)),
            }
        }
        ProjectCommands::Delete(args) => {
            if app.delete_project(&args.id)? {
                println!("deleted {} and its tasks", args.id);
            } else {
                println!("nothing to delete: {}", args.id);
            }
        }
        ProjectCommands::Archive(args) => {
            let project = app.archive_project(&args.id, args.force)?;
            println!("archived {}", project.id);
        }
    }
    Ok(())
}

fn run_task(app: &app::App, command: cli::TaskCommands) -> Result<(), app::AppError> {
    use cli::TaskCommands;
    match command {
        TaskCommands::New(args) => {
            let task = app.create_task(domain::task::NewTask {
                project_id: args.project,
                owner: args.owner,
                title: args.title,
                description: args.desc,
                priority: dispatch::parse_priority(args.priority.as_deref())?,
                tags: args.tags,
                due_date: args.due,
                depends_on: args.depends_on,
            })?;
            println!("created {} {}", task.id, task.title);
        }
        TaskCommands::Ls(args) => {
            let filter = listing::TaskListFilter {
                status: args.status,
                tag: args.tag,
            };
            let tasks =
                listing::apply_task_filters(app.list_tasks(args.project.as_deref())?, &filter);
            if args.json {
                print_json(&tasks);
            } else {
                ui::print_task_list(&tasks, &filter);
            }
        }
        TaskCommands::Show(args) => match app.show_task(&args.id)? {
            Some(task) => print_json(&task),
            None => return Err(app::AppError::NotFound(args.id)),
        },
        TaskCommands::Update(args) => {
            let id = args.id.clone();
            match app.update_task(&id, dispatch::task_patch(args)?)? {
                Some(task) => println!("updated {} [{}]", task.id, task.status),
                None => return Err(app::AppError::NotFound(id)),
            }
        }
        TaskCommands::Delete(args) => {
            if app.delete_task(&args.id)? {
                println!("deleted {}", args.id);
            } else {
                println!("nothing to delete: {}", args.id);
            }
        }
        TaskCommands::Start(args) => match app.start_task(&args.id)? {
            Some(task) => println!("timer running on {}", task.id),
            None => return Err(app::AppError::NotFound(args.id)),
        },
        TaskCommands::Stop(args) => match app.stop_task(&args.id)? {
            Some(task) => println!("{} at {} minute(s)", task.id, task.time_spent_minutes),
            None => return Err(app::AppError::NotFound(args.id)),
        },
        TaskCommands::Done(args) => match app.complete_task(&args.id)? {
            Some(task) => println!("completed {}", task.id),
            None => return Err(app::AppError::NotFound(args.id)),
        },
    }
    Ok(())
}

fn run_post(app: &app::App, command: cli::PostCommands) -> Result<(), app::AppError> {
    use cli::PostCommands;
    match command {
        PostCommands::New(args) => {
            let post = app.create_post(&args.owner, &args.content)?;
            println!("posted {}", post.id);
        }
        PostCommands::Ls(args) => {
            let posts = app.list_posts()?;
            if args.json {
                print_json(&posts);
            } else {
                ui::print_post_list(&posts);
            }
        }
        PostCommands::Like(args) => match app.like_post(&args.id, &args.user)? {
            Some(post) => println!("{} has {} like(s)", post.id, post.likes.len()),
            None => return Err(app::AppError::NotFound(args.id)),
        },
        PostCommands::Unlike(args) => match app.unlike_post(&args.id, &args.user)? {
            Some(post) => println!("{} has {} like(s)", post.id, post.likes.len()),
            None => return Err(app::AppError::NotFound(args.id)),
        },
        PostCommands::Comment(args) => {
            match app.comment_post(&args.id, &args.owner, &args.content)? {
                Some(post) => println!("{} has {} comment(s)", post.id, post.comments.len()),
                None => return Err(app::AppError::NotFound(args.id)),
            }
        }
        PostCommands::Delete(args) => {
            if app.delete_post(&args.id)? {
                println!("deleted {}", args.id);
            } else {
                println!("nothing to delete: {}", args.id);
            }
        }
    }
    Ok(())
}

fn run_resource(
    app: &app::App,
    command: cli::ResourceCommands,
) -> Result<(), app::AppError> {
    use cli::ResourceCommands;
    match command {
        ResourceCommands::Attach(args) => {
            let marker = app.attach_resource(&args.project, &args.name)?;
            println!("attached {} as {}", marker.name, marker.resource_id);
        }
        ResourceCommands::Detach(args) => {
            if app.detach_resource(&args.project, &args.resource)? {
                println!("detached {}", args.resource);
            } else {
                println!("nothing to detach: {}", args.resource);
            }
        }
        ResourceCommands::Ls(args) => {
            print_json(&app.list_resources(&args.id)?);
        }
    }
    Ok(())
}
