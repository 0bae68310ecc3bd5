use std::{sync::Arc, time::Duration};

use rand::{prelude::Distribution, rngs::SmallRng, SeedableRng};
use statrs::{distribution::Erlang, statistics::Statistics};
use tokio::time::Instant;

use site_pacer::{AutoWait, Config, DelayBounds, Pacer, SharedMonitor};

/// A remote service which slows down when requests arrive too quickly during an incident.
struct Server {
    latency: Erlang,

    /// While degraded, requests closer together than this are slowed down.
    min_spacing: Duration,
    slowdown: f64,
}

/// When the server is degraded, relative to the start of the simulation.
struct Incident {
    start: Duration,
    end: Duration,
}

#[derive(Debug)]
struct Request {
    /// Since the start of the simulation.
    sent_at: Duration,
    /// The delay observed before sending.
    spacing: Duration,
    latency: Duration,
    /// The delay issued after the response.
    delay: Duration,
}

impl Server {
    /// The latency is calculated according to the number of tasks needed to be performed and the
    /// average rate of completion of these tasks (per second).
    fn new(tasks: u64, task_rate: f64) -> Self {
        Self {
            latency: Erlang::new(tasks, task_rate).unwrap(),
            min_spacing: Duration::from_secs(10),
            slowdown: 5.0,
        }
    }

    fn handle(&self, rng: &mut SmallRng, spacing: Duration, degraded: bool) -> Duration {
        let latency = self.latency.sample(rng);
        if degraded && spacing < self.min_spacing {
            Duration::from_secs_f64(latency * self.slowdown)
        } else {
            Duration::from_secs_f64(latency)
        }
    }
}

impl Incident {
    fn contains(&self, elapsed: Duration) -> bool {
        (self.start..self.end).contains(&elapsed)
    }
}

fn config() -> Config {
    Config::default()
        .with_burn_in(50)
        .with_choke_point(3.0)
        .with_slow_down_threshold(5)
        .with_speed_up_threshold(5)
        .with_rolling_mean_length(10)
        .with_delays(DelayBounds {
            burn_in: Duration::from_secs(1),
            min: Duration::ZERO,
            max: Duration::from_secs(30),
            step: Duration::from_secs(5),
        })
}

/// Precondition: time has been paused.
async fn simulate(
    pacer: &impl Pacer,
    incident: &Incident,
    max_time: Duration,
    seed: u64,
) -> Vec<Request> {
    let start = Instant::now();
    let mut rng = SmallRng::seed_from_u64(seed);
    let server = Server::new(2, 10.0);

    let mut results = vec![];
    let mut spacing = Duration::ZERO;

    while start.elapsed() < max_time {
        let sent_at = start.elapsed();

        let latency = server.handle(&mut rng, spacing, incident.contains(sent_at));
        tokio::time::sleep(latency).await;

        // Sleeps for the delay.
        let delay = pacer.report(None, latency).await.unwrap();

        results.push(Request {
            sent_at,
            spacing,
            latency,
            delay,
        });
        spacing = delay;
    }

    results
}

#[tokio::test(start_paused = true)]
async fn backs_off_during_incident_and_recovers() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let monitor = Arc::new(SharedMonitor::new(config()).unwrap());
    let pacer = AutoWait::new(Arc::clone(&monitor));

    let incident = Incident {
        start: Duration::from_secs(120),
        end: Duration::from_secs(600),
    };
    let results = simulate(&pacer, &incident, Duration::from_secs(900), 0x5eed).await;

    assert!(
        results.iter().all(|r| r.delay <= Duration::from_secs(30)),
        "delay never exceeds max"
    );

    let before: Vec<_> = results
        .iter()
        .filter(|r| r.sent_at >= Duration::from_secs(70) && r.sent_at < incident.start)
        .collect();
    assert!(
        before.iter().all(|r| r.delay == Duration::ZERO),
        "no back-off while the server is healthy"
    );

    let during: Vec<_> = results
        .iter()
        .filter(|r| incident.contains(r.sent_at))
        .collect();
    assert!(
        during.iter().any(|r| r.delay >= Duration::from_secs(10)),
        "should back off far enough to relieve the server"
    );

    // Mean latency in seconds.
    let backed_off = during
        .iter()
        .filter(|r| r.spacing >= Duration::from_secs(10))
        .map(|r| r.latency.as_secs_f64())
        .mean();
    let pressing = during
        .iter()
        .filter(|r| r.spacing < Duration::from_secs(10))
        .map(|r| r.latency.as_secs_f64())
        .mean();
    assert!(
        backed_off < pressing,
        "latency should be lower when backed off: {backed_off:.3}s vs {pressing:.3}s"
    );

    assert_eq!(
        results.last().unwrap().delay,
        Duration::ZERO,
        "should speed up again after the incident"
    );

    let snapshot = monitor.snapshot().await;
    assert_eq!(
        snapshot.histogram().total(),
        u64::try_from(results.len()).unwrap()
    );
    let category = &snapshot.categories()[0];
    assert_eq!(category.history().len(), results.len());
    assert_eq!(category.rolling_means().len(), results.len() - 50);
}
