use anyhow::{bail, Context, Error, Result};
use osmc_core::interfaces::{ChannelVelocitySink, WatchTraceSink};
use osmc_core::lifecycle;
use osmc_core::perception::spawn_pose_listener;
use osmc_core::sim::{spawn_sim, UnicycleSim};
use osmc_core::{Goal, GoalServer, OsmcParams, Pose2D, PoseStore};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

const DEFAULT_PARAMS: &str = "config/osmc_params.yaml";

fn load_params(path: Option<&str>) -> Result<OsmcParams> {
    match path {
        Some(path) => OsmcParams::from_yaml_file(path)
            .with_context(|| format!("loading parameters from {}", path)),
        None if Path::new(DEFAULT_PARAMS).exists() => OsmcParams::from_yaml_file(DEFAULT_PARAMS)
            .with_context(|| format!("loading parameters from {}", DEFAULT_PARAMS)),
        None => Ok(OsmcParams::default()),
    }
}

fn parse_target(args: &[String]) -> Result<Pose2D> {
    if args.len() < 4 {
        bail!(
            "usage: {} <x> <y> <yaw> [params.yaml]",
            args.first().map(String::as_str).unwrap_or("osmc_action_server")
        );
    }
    let mut values = [0.0; 3];
    for (value, arg) in values.iter_mut().zip(&args[1..4]) {
        *value = arg
            .parse()
            .with_context(|| format!("'{}' is not a number", arg))?;
    }
    Ok(Pose2D::new(values[0], values[1], values[2]))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let target = parse_target(&args)?;
    let params = load_params(args.get(4).map(String::as_str))?;
    log::info!("Using parameters: {:?}", params);

    let pose_store = Arc::new(PoseStore::new());

    // Simulated robot: cmd_vel in, odometry out through the pose feed
    let (velocity_sink, cmd_rx) = ChannelVelocitySink::channel(16);
    let (pose_tx, pose_rx) = mpsc::channel(16);
    let listener = spawn_pose_listener(pose_rx, Arc::clone(&pose_store));
    let sim = spawn_sim(
        UnicycleSim::new(Pose2D::default()),
        cmd_rx,
        pose_tx,
        params.period() / 4,
    );

    let (trace_sink, mut trace_rx) = WatchTraceSink::channel(&params.frame_id);
    tokio::spawn(async move {
        while trace_rx.changed().await.is_ok() {
            let len = trace_rx.borrow().len();
            log::debug!("Path trace now holds {} poses", len);
        }
    });

    let server = Arc::new(GoalServer::new(
        params,
        pose_store,
        Arc::new(velocity_sink),
        Arc::new(trace_sink),
    )?);
    lifecycle::bring_up(server.as_ref())?;

    let interrupt = {
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                server.cancel();
            }
        })
    };

    // Let the first odometry sample arrive before submitting
    tokio::time::sleep(server.params().period()).await;

    let result = server.submit(Goal::new(target)).await;
    lifecycle::tear_down(server.as_ref())?;
    interrupt.abort();
    // an aborted task still holds its server handle until it is reaped
    let _ = interrupt.await;

    match result {
        Ok(report) => {
            log::info!(
                "Succeeded after {} cycles, final pose ({:.3},{:.3}) heading {:.3}",
                report.cycles,
                report.final_pose.x,
                report.final_pose.y,
                report.final_pose.heading
            );
        }
        Err(e) => log::warn!("Goal did not complete: {}", e),
    }

    // Dropping the last server handle closes cmd_vel, which stops the
    // simulator and with it the pose feed
    drop(server);
    let final_pose = sim.await?;
    listener.await?;
    log::info!("Robot came to rest at {:?}", final_pose);
    Ok(())
}
