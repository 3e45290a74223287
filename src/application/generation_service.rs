// CNC data generator - Drives the cycle simulator on a fixed interval
use crate::application::monitoring_repository::TelemetrySink;
use crate::domain::cnc_cycle::CycleState;
use crate::domain::cnc_telemetry::{MachineStatusUpdate, TelemetrySample};
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, oneshot};
use tokio::time::{Instant, MissedTickBehavior, interval_at};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("machine {0} not found")]
    MachineNotFound(String),
    #[error("machine lookup failed: {0:#}")]
    Lookup(anyhow::Error),
    #[error("failed to persist telemetry: {0:#}")]
    Persistence(anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    /// External key of the simulated machine
    pub machine_key: String,
    pub interval: Duration,
    /// Fixed rng seed; entropy-seeded when absent
    pub seed: Option<u64>,
}

struct Simulator {
    state: CycleState,
    rng: StdRng,
}

struct RunningGeneration {
    machine_id: i64,
    stop_tx: oneshot::Sender<()>,
}

pub struct CncDataGenerator {
    sink: Arc<dyn TelemetrySink>,
    settings: GeneratorSettings,
    simulator: Arc<Mutex<Simulator>>,
    running: Mutex<Option<RunningGeneration>>,
}

impl CncDataGenerator {
    pub fn new(sink: Arc<dyn TelemetrySink>, settings: GeneratorSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let simulator = Simulator {
            state: CycleState::new(Utc::now()),
            rng,
        };
        Self {
            sink,
            settings,
            simulator: Arc::new(Mutex::new(simulator)),
            running: Mutex::new(None),
        }
    }

    pub fn machine_key(&self) -> &str {
        &self.settings.machine_key
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Start ticking for the configured machine, replacing any active timer.
    ///
    /// Returns whether generation is running afterwards. A missing machine or a
    /// failed lookup is logged and leaves generation stopped.
    pub async fn start_generation(&self) -> bool {
        let mut running = self.running.lock().await;

        let machine_id = match self.resolve_machine().await {
            Ok(id) => id,
            Err(e @ GenerationError::MachineNotFound(_)) => {
                tracing::warn!("{}, skipping data generation", e);
                return running.is_some();
            }
            Err(e) => {
                tracing::error!("{}", e);
                return running.is_some();
            }
        };

        if let Some(previous) = running.take() {
            tracing::debug!(machine_id = previous.machine_id, "Replacing active CNC data generation");
            let _ = previous.stop_tx.send(());
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        tokio::spawn(run_generation(
            self.sink.clone(),
            self.simulator.clone(),
            machine_id,
            self.settings.interval,
            stop_rx,
        ));
        *running = Some(RunningGeneration { machine_id, stop_tx });

        tracing::info!(
            machine_id,
            interval_secs = self.settings.interval.as_secs_f64(),
            "Starting CNC data generation for machine {}",
            self.settings.machine_key
        );
        true
    }

    /// Cancel future ticks. An in-flight write is left to finish.
    pub async fn stop_generation(&self) {
        if let Some(active) = self.running.lock().await.take() {
            let _ = active.stop_tx.send(());
            tracing::info!(machine_id = active.machine_id, "CNC data generation stopped");
        }
    }

    async fn resolve_machine(&self) -> Result<i64, GenerationError> {
        let key = &self.settings.machine_key;
        self.sink
            .resolve_machine(key)
            .await
            .map_err(GenerationError::Lookup)?
            .ok_or_else(|| GenerationError::MachineNotFound(key.clone()))
    }
}

async fn run_generation(
    sink: Arc<dyn TelemetrySink>,
    simulator: Arc<Mutex<Simulator>>,
    machine_id: i64,
    period: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    // A slow write delays the next tick instead of stacking them up
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                if let Err(e) = generate_tick(sink.as_ref(), &simulator, machine_id).await {
                    tracing::error!(machine_id, "Error generating CNC telemetry: {}", e);
                }
            }
        }
    }

    tracing::debug!(machine_id, "CNC generation task exited");
}

async fn generate_tick(
    sink: &dyn TelemetrySink,
    simulator: &Mutex<Simulator>,
    machine_id: i64,
) -> Result<TelemetrySample, GenerationError> {
    let now = Utc::now();
    let sample = {
        let mut guard = simulator.lock().await;
        let Simulator { state, rng } = &mut *guard;
        state.next_sample(now, rng)
    };

    sink.persist_sample(machine_id, &sample)
        .await
        .map_err(GenerationError::Persistence)?;
    sink.update_machine_status(machine_id, MachineStatusUpdate::from_sample(&sample, now))
        .await
        .map_err(GenerationError::Persistence)?;

    tracing::trace!(machine_id, part_count = sample.part_count, "Generated CNC sample");
    Ok(sample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingSink {
        machine_id: Option<i64>,
        fail_writes: bool,
        persist_attempts: AtomicUsize,
        samples: std::sync::Mutex<Vec<TelemetrySample>>,
        statuses: std::sync::Mutex<Vec<MachineStatusUpdate>>,
    }

    impl RecordingSink {
        fn attempts(&self) -> usize {
            self.persist_attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TelemetrySink for RecordingSink {
        async fn resolve_machine(&self, _machine_key: &str) -> anyhow::Result<Option<i64>> {
            Ok(self.machine_id)
        }

        async fn persist_sample(&self, _machine_id: i64, sample: &TelemetrySample) -> anyhow::Result<()> {
            self.persist_attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                anyhow::bail!("database is locked");
            }
            self.samples.lock().unwrap().push(sample.clone());
            Ok(())
        }

        async fn update_machine_status(&self, _machine_id: i64, status: MachineStatusUpdate) -> anyhow::Result<()> {
            self.statuses.lock().unwrap().push(status);
            Ok(())
        }
    }

    fn generator(sink: Arc<RecordingSink>) -> CncDataGenerator {
        CncDataGenerator::new(
            sink,
            GeneratorSettings {
                machine_key: "HAAS-VF2-001".to_string(),
                interval: Duration::from_secs(5),
                seed: Some(11),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_persist_sample_and_status() {
        let sink = Arc::new(RecordingSink {
            machine_id: Some(1),
            ..Default::default()
        });
        let generator = generator(sink.clone());

        assert!(generator.start_generation().await);
        tokio::time::sleep(Duration::from_secs(11)).await;
        generator.stop_generation().await;

        let samples = sink.samples.lock().unwrap().clone();
        let statuses = sink.statuses.lock().unwrap().clone();
        assert_eq!(samples.len(), 2);
        assert_eq!(statuses.len(), 2);
        for (sample, status) in samples.iter().zip(&statuses) {
            assert_eq!(status.temperature, sample.coolant_temp + 20.0);
            assert_eq!(status.vibration, sample.mean_vibration());
            assert_eq!(status.kw_used, sample.power_consumption);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_keeps_one_timer() {
        let sink = Arc::new(RecordingSink {
            machine_id: Some(1),
            ..Default::default()
        });
        let generator = generator(sink.clone());

        assert!(generator.start_generation().await);
        assert!(generator.start_generation().await);
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(sink.attempts(), 3);

        generator.stop_generation().await;
        assert!(!generator.is_running().await);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(sink.attempts(), 3);

        // Stopping twice is harmless
        generator.stop_generation().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_machine_does_not_start() {
        let sink = Arc::new(RecordingSink::default());
        let generator = generator(sink.clone());

        assert!(!generator.start_generation().await);
        assert!(!generator.is_running().await);
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(sink.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failures_do_not_stop_timer() {
        let sink = Arc::new(RecordingSink {
            machine_id: Some(1),
            fail_writes: true,
            ..Default::default()
        });
        let generator = generator(sink.clone());

        assert!(generator.start_generation().await);
        tokio::time::sleep(Duration::from_secs(16)).await;

        assert_eq!(sink.attempts(), 3);
        assert!(generator.is_running().await);
        assert!(sink.statuses.lock().unwrap().is_empty());
        generator.stop_generation().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_state_survives_restart() {
        let sink = Arc::new(RecordingSink {
            machine_id: Some(1),
            ..Default::default()
        });
        let generator = generator(sink.clone());

        for _ in 0..3 {
            generator.start_generation().await;
            tokio::time::sleep(Duration::from_secs(6)).await;
            generator.stop_generation().await;
        }

        let samples = sink.samples.lock().unwrap().clone();
        assert_eq!(samples.len(), 3);
        assert!(samples.windows(2).all(|w| w[0].part_count <= w[1].part_count));
        assert!(samples.iter().all(|s| (1..=20).contains(&s.tool_number)));
    }
}
