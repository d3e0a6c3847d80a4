use std::{env, future::Future};

use anyhow::{Error, Result};
use tokio::task;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::{ingest, logging};

/// 啟動排程
pub async fn start(sched: &JobScheduler) -> Result<()> {
    run_cron(sched).await?;

    // one immediate pass on startup, then the cron takes over
    task::spawn(async move {
        if let Err(why) = ingest::execute().await {
            logging::error_file_async(format!("{:?}", why));
        }
    });

    logging::info_file_async(format!(
        "StockIngest started. Rust OS/Arch: {}/{}",
        env::consts::OS,
        env::consts::ARCH
    ));

    Ok(())
}

async fn run_cron(sched: &JobScheduler) -> std::result::Result<(), JobSchedulerError> {
    //                 sec  min   hour   day of month   month   day of week
    let jobs = vec![
        // hourly: pull intraday quotes for the configured symbols
        create_job("0 0 * * * *", ingest::execute),
    ];

    for job in jobs.into_iter().flatten() {
        sched.add(job).await?;
    }

    sched.start().await
}

fn create_job<F, Fut>(cron_expr: &'static str, task: F) -> Result<Job>
where
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send,
{
    Ok(Job::new_async(cron_expr, move |_uuid, _l| {
        let task = task.clone();
        Box::pin(async move {
            if let Err(why) = task().await {
                logging::error_file_async(format!(
                    "Failed to execute task({}) because {:?}",
                    cron_expr, why
                ));
            }
        })
    })?)
}
