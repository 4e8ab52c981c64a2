use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use exercise_runner::catalog::ExerciseCatalog;
use exercise_runner::config::{CliArgs, Command, Config, ServerConfig};
use exercise_runner::queue::JobQueue;
use exercise_runner::sandbox::WorkspaceManager;
use exercise_runner::verifier::{Verifier, VerifyRequest};
use exercise_runner::web_server::build_server;
use exercise_runner::worker::worker;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = CliArgs::parse();
    let config = cli.to_config().context("Failed to load configuration")?;
    let (server_config, verifier) = build_verifier(config)?;

    match cli.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(server_config, verifier, cli.worker_count()).await,
        Command::Verify {
            exercise,
            language,
            file,
        } => {
            let code = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let request = VerifyRequest {
                exercise_id: exercise,
                code,
                language,
            };
            verify_once(&verifier, &request).await
        }
        Command::Exercises => {
            for exercise in verifier.catalog().exercises() {
                println!(
                    "{}\t{}\t{}",
                    exercise.id,
                    exercise.function_name,
                    exercise.title
                );
            }
            Ok(())
        }
    }
}

fn build_verifier(config: Config) -> anyhow::Result<(ServerConfig, Verifier)> {
    let workspace_root = config.workspace_root();
    let Config {
        server,
        limits,
        toolchains,
        exercises,
        ..
    } = config;

    let catalog = match exercises {
        Some(exercises) => ExerciseCatalog::new(exercises).context("Invalid exercise catalog")?,
        None => ExerciseCatalog::builtin(),
    };
    log::info!("Loaded {} exercises", catalog.len());

    let workspaces = WorkspaceManager::new(&workspace_root).with_context(|| {
        format!(
            "Failed to create workspace root {}",
            workspace_root.display()
        )
    })?;

    let verifier = Verifier::new(Arc::new(catalog), &toolchains, workspaces, limits);
    Ok((server, verifier))
}

async fn verify_once(verifier: &Verifier, request: &VerifyRequest) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let report = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            bail!("Interrupted");
        }
        report = verifier.verify_request(request, &cancel) => report?,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn serve(
    server_config: ServerConfig,
    verifier: Verifier,
    n_workers: usize,
) -> anyhow::Result<()> {
    if n_workers == 0 {
        bail!("The number of worker threads must not be 0");
    }

    let verifier = Arc::new(verifier);
    let job_queue = Arc::new(JobQueue::new());
    let shutdown_token = CancellationToken::new();

    // ======= PREPARATION END, EXECUTION START =======

    let mut workers = JoinSet::new();
    for i in 1..=n_workers {
        workers.spawn(worker(
            i,
            verifier.clone(),
            job_queue.clone(),
            shutdown_token.clone(),
        ));
    }

    let server = build_server(server_config, verifier, job_queue.clone())
        .context("Failed to build server")?;

    let server_handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    // ===== EXECUTION END, WAITING FOR SHUTDOWN ======

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("Ctrl-c received, shutting down...");
        }
        res_server = server_task => {
            log::error!("Server terminated unexpectedly: {:?}", res_server);
        }
        Some(res_worker) = workers.join_next() => {
            log::error!("A worker terminated unexpectedly: {:?}", res_worker);
        }
    }

    // 1. Shutdown actix-web server gracefully
    server_handle.stop(true).await;

    // 2. Broadcast shutdown signal to workers, which kill their running jobs
    shutdown_token.cancel();
    log::info!("Shutdown signal sent to workers, waiting for them to finish...");

    // 3. Wait until every worker terminates
    while let Some(res) = workers.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("Worker finished with error: {e:?}"),
            Err(e) if e.is_panic() => log::error!("Worker handle panicked: {:?}", e),
            Err(e) => log::error!("Worker handle finished with error: {:?}", e),
        }
    }

    let dropped = job_queue.purge_cancelled();
    if dropped > 0 {
        log::info!("Dropped {dropped} cancelled jobs left in the queue");
    }

    log::info!("Shutdown complete");
    Ok(())
}
