use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use fanout_topic::{TopicError, TopicRegistry};

use crate::config::{DemoConfig, RunArgs};
use crate::error::DemoError;
use crate::report::{ConsumerReport, RunReport};
use crate::worker::{spawn_consumer, spawn_producer};

pub async fn run(args: RunArgs) -> Result<(), DemoError> {
    tracing::info!("fanout-demo starting");

    // --- Load config ---
    let config = DemoConfig::load_or_default(&args.config)?.with_overrides(&args);
    config.validate()?;
    tracing::info!(
        config = %args.config,
        topic = %config.topic,
        producers = config.producers.len(),
        consumers = config.consumers.len(),
        expected = config.expected_messages(),
        "loaded config"
    );

    let report = execute(&config, shutdown_signal()).await?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render_text());
    }
    if !report.is_complete() {
        tracing::warn!(topic = %report.topic, "not every consumer received every message");
    }
    Ok(())
}

async fn shutdown_signal() -> Result<(), DemoError> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

/// Drive one topic: consumers first, then producers, then shutdown and drain.
///
/// `interrupt` is raced against the settle pause, the producers and the
/// drain pause. When it resolves, producers stop and the remaining pause is
/// cut short; whatever was already published is still delivered to every
/// consumer. After it has resolved once, further signals are ignored.
///
/// The topic is shut down and every consumer joined on all paths, including
/// errors from `interrupt` or from a producer.
pub async fn execute<F>(config: &DemoConfig, interrupt: F) -> Result<RunReport, DemoError>
where
    F: Future<Output = Result<(), DemoError>>,
{
    let registry = TopicRegistry::new();
    let topic = registry.get_or_create(&config.topic, config.topic_config.clone());
    let token = CancellationToken::new();
    tokio::pin!(interrupt);
    let mut signal: Option<Result<(), DemoError>> = None;

    // --- Consumers: register + spawn ---
    let consumers: Vec<JoinHandle<Result<ConsumerReport, TopicError>>> = config
        .consumers
        .iter()
        .map(|c| spawn_consumer(topic.clone(), c.clone()))
        .collect();
    tracing::info!(topic = %config.topic, count = consumers.len(), "started consumers");

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_millis(config.settle_ms)) => {}
        sig = &mut interrupt => signal = Some(interrupted(sig, &token)),
    }

    // --- Producers ---
    // A cancelled token makes producers exit before their first publish.
    let producers: Vec<JoinHandle<Result<usize, TopicError>>> = config
        .producers
        .iter()
        .map(|p| spawn_producer(topic.clone(), p.clone(), token.clone()))
        .collect();
    tracing::info!(topic = %config.topic, count = producers.len(), "started producers");

    let mut producers_done = tokio::spawn(join_producers(producers));
    let joined = if signal.is_some() {
        producers_done.await
    } else {
        tokio::select! {
            res = &mut producers_done => res,
            sig = &mut interrupt => {
                signal = Some(interrupted(sig, &token));
                producers_done.await
            }
        }
    };
    let produced = joined.map_err(DemoError::from).and_then(|res| res);
    match &produced {
        Ok(published) => tracing::info!(topic = %config.topic, published, "producers finished"),
        Err(e) => tracing::error!(topic = %config.topic, error = %e, "producer failed"),
    }

    // --- Drain + shutdown ---
    if signal.is_none() && produced.is_ok() {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(config.drain_ms)) => {}
            sig = &mut interrupt => signal = Some(interrupted(sig, &token)),
        }
    }
    token.cancel();
    registry.shutdown_all();

    let mut reports = Vec::with_capacity(consumers.len());
    let mut consumer_err: Option<DemoError> = None;
    for handle in consumers {
        match handle.await {
            Ok(Ok(report)) => reports.push(report),
            Ok(Err(e)) => {
                consumer_err.get_or_insert(e.into());
            }
            Err(e) => {
                consumer_err.get_or_insert(e.into());
            }
        }
    }

    if let Some(Err(e)) = signal {
        return Err(e);
    }
    let published = produced?;
    if let Some(e) = consumer_err {
        return Err(e);
    }

    Ok(RunReport {
        topic: config.topic.clone(),
        published,
        consumers: reports,
        stats: topic.snapshot(),
    })
}

async fn join_producers(
    producers: Vec<JoinHandle<Result<usize, TopicError>>>,
) -> Result<usize, DemoError> {
    let mut published = 0;
    for handle in producers {
        published += handle.await??;
    }
    Ok(published)
}

fn interrupted(
    sig: Result<(), DemoError>,
    token: &CancellationToken,
) -> Result<(), DemoError> {
    match &sig {
        Ok(()) => tracing::warn!("interrupted, stopping producers"),
        Err(e) => tracing::error!(error = %e, "interrupt failed, stopping producers"),
    }
    token.cancel();
    sig
}
