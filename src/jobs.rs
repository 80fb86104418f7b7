use tokio::time::interval;

use crate::app_context::AppContext;
use crate::monitor::{record_tick, ProcStatSource, Sampler};

pub fn start_background_jobs(app_context: AppContext) {
    start_sampler_job(app_context);
}

/// The single ticker task owning the sampler. One writer over the
/// previous-snapshot cell; the first tick fires immediately, seeding
/// history with a startup sample.
fn start_sampler_job(app_context: AppContext) {
    tokio::spawn(async move {
        let sampler = Sampler::new(ProcStatSource::new());
        let mut sampler = match sampler {
            Ok(sampler) => sampler,
            Err(error) => {
                log::error!("CRITICAL: cpu counter source unavailable: {}", error);
                return;
            }
        };

        let mut ticker = interval(app_context.config.sample_period());

        loop {
            ticker.tick().await;
            record_tick(&app_context, &mut sampler).await;
        }
    });
}
