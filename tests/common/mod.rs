#![allow(dead_code)]

use osmc_core::interfaces::WatchTraceSink;
use osmc_core::lifecycle;
use osmc_core::sim::SimulatedBase;
use osmc_core::{
    GoalServer, OsmcParams, PathTrace, Pose2D, PoseStore, SinkError, VelocityCommand,
    VelocitySink,
};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Keeps every command it sees, optionally forwarding to another sink
#[derive(Default)]
pub struct RecordingSink {
    commands: Mutex<Vec<VelocityCommand>>,
    forward: Option<Arc<dyn VelocitySink>>,
}

impl RecordingSink {
    pub fn forwarding(forward: Arc<dyn VelocitySink>) -> Self {
        RecordingSink {
            commands: Mutex::new(Vec::new()),
            forward: Some(forward),
        }
    }

    pub fn commands(&self) -> Vec<VelocityCommand> {
        self.commands.lock().unwrap().clone()
    }
}

impl VelocitySink for RecordingSink {
    fn send(&self, command: VelocityCommand) -> Result<(), SinkError> {
        self.commands.lock().unwrap().push(command);
        match &self.forward {
            Some(forward) => forward.send(command),
            None => Ok(()),
        }
    }
}

pub struct Rig {
    pub server: Arc<GoalServer>,
    pub store: Arc<PoseStore>,
    pub sink: Arc<RecordingSink>,
    pub traces: watch::Receiver<PathTrace>,
}

fn rig(params: OsmcParams, store: Arc<PoseStore>, sink: Arc<RecordingSink>) -> Rig {
    let (trace_sink, traces) = WatchTraceSink::channel(&params.frame_id);
    let server = GoalServer::new(
        params,
        Arc::clone(&store),
        sink.clone(),
        Arc::new(trace_sink),
    )
    .unwrap();
    let server = Arc::new(server);
    lifecycle::bring_up(server.as_ref()).unwrap();
    Rig {
        server,
        store,
        sink,
        traces,
    }
}

/// An active goal server whose pose only changes when the test says so
pub fn static_rig(params: OsmcParams) -> Rig {
    rig(
        params,
        Arc::new(PoseStore::new()),
        Arc::new(RecordingSink::default()),
    )
}

/// An active goal server driving a simulated unicycle that starts at `start`
pub fn sim_rig(params: OsmcParams, start: Pose2D) -> Rig {
    let store = Arc::new(PoseStore::new());
    let base = SimulatedBase::new(start, Arc::clone(&store), params.period());
    let sink = Arc::new(RecordingSink::forwarding(Arc::new(base)));
    rig(params, store, sink)
}
