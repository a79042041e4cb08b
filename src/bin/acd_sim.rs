use acd_queue::{CallHooks, CallQueue, HuntGroups, QueueError, QueuedCall};
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::sleep;

#[derive(clap::Parser)]
struct CliArgs {
    #[clap(short, long, default_value = "3")]
    agents: usize,
    #[clap(short, long, default_value = "20")]
    calls: usize,
    #[clap(short, long, default_value = "2")]
    producers: usize,
    /// Time an agent spends on each call.
    #[clap(long, default_value = "50")]
    handle_ms: u64,
    #[clap(short, long, default_value = "support")]
    group: String,
}

struct SimCall {
    caller: String,
    arrived: Instant,
}

impl CallHooks for SimCall {
    fn on_hold(&mut self) {
        log::debug!("{} placed on hold", self.caller);
    }

    fn on_ready(&mut self) {
        log::debug!("{} connecting after {:?}", self.caller, self.arrived.elapsed());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    Builder::new()
        .filter(Some("acd_queue"), LevelFilter::Info)
        .filter(Some("acd_sim"), LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = CliArgs::parse();
    anyhow::ensure!(args.producers > 0, "at least one producer is required");

    let groups: HuntGroups<SimCall> = HuntGroups::new();
    let (group, queue) = groups.declare(&args.group);
    log::info!(
        "hunt group {}: {} agents, {} calls from {} producers",
        group,
        args.agents,
        args.calls,
        args.producers
    );

    // Agents give up once the line has been quiet for a while.
    let idle = Duration::from_millis((args.handle_ms * 10).max(250));
    let mut agents = JoinSet::new();
    for agent in 0..args.agents {
        let queue = Arc::clone(&queue);
        let handle = Duration::from_millis(args.handle_ms);
        agents.spawn(async move { run_agent(agent, queue, handle, idle).await });
    }

    let mut producers = JoinSet::new();
    for producer in 0..args.producers {
        let queue = Arc::clone(&queue);
        let share = args.calls / args.producers + usize::from(producer < args.calls % args.producers);
        producers.spawn(async move { run_producer(producer, queue, share).await });
    }
    while let Some(res) = producers.join_next().await {
        res??;
    }

    let mut tally = HashMap::new();
    while let Some(res) = agents.join_next().await {
        let (agent, handled) = res?;
        tally.insert(agent, handled);
    }

    let mut agent_ids: Vec<_> = tally.keys().copied().collect();
    agent_ids.sort();
    for agent in agent_ids {
        log::info!("agent {} handled {} calls", agent, tally[&agent]);
    }

    let stats = queue.stats();
    log::info!(
        "enqueued {}, delivered {}, left in queue {}",
        stats.enqueued,
        stats.delivered,
        stats.queued
    );
    anyhow::ensure!(stats.queued == 0, "{} calls were never answered", stats.queued);
    Ok(())
}

async fn run_producer(
    producer: usize,
    queue: Arc<CallQueue<SimCall>>,
    calls: usize,
) -> anyhow::Result<()> {
    for n in 0..calls {
        let call = SimCall {
            caller: format!("caller-{producer}-{n}"),
            arrived: Instant::now(),
        };
        queue.enqueue(QueuedCall::new(call))?;
        sleep(Duration::from_millis(rand::random_range(5..25))).await;
    }
    Ok(())
}

async fn run_agent(
    agent: usize,
    queue: Arc<CallQueue<SimCall>>,
    handle: Duration,
    idle: Duration,
) -> (usize, usize) {
    let mut handled = 0;
    loop {
        match queue.next_call_timeout(idle).await {
            Ok(call) => {
                log::info!("agent {} answered {}", agent, call.caller);
                sleep(handle).await;
                handled += 1;
            }
            Err(QueueError::Timeout(_)) => break,
            Err(err) => {
                log::warn!("agent {} failed to take a call: {}", agent, err);
                break;
            }
        }
    }
    (agent, handled)
}
