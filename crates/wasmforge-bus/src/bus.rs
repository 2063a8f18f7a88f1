//! PubSub Bus (C2): cross-process fan-out of per-job log and status
//! events over Redis. A single in-process broadcast channel can't reach
//! subscribers connected to a different API instance than the worker
//! that produced the event, so fan-out goes through Redis pub/sub
//! instead — best-effort, fire-and-forget (spec §4.2, §4.10).

use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;
use wasmforge_core::job::{JobResult, JobStatus, LogRecord};
use wasmforge_core::ResourceId;

use crate::BusResult;

fn log_channel(job_id: ResourceId) -> String {
    format!("job:log:{job_id}")
}

fn status_channel(job_id: ResourceId) -> String {
    format!("job:status:{job_id}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LogEnvelope {
    job_id: ResourceId,
    log: LogRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StatusEnvelope {
    job_id: ResourceId,
    status: JobStatus,
    result: Option<JobResult>,
}

/// An event received from a job's log/status subscription.
#[derive(Debug, Clone)]
pub enum BusEvent {
    Log(LogRecord),
    Status {
        status: JobStatus,
        result: Option<JobResult>,
    },
}

/// Handle to the Redis bus. Cheap to clone (wraps a multiplexed
/// connection); one instance per process (spec §9).
#[derive(Clone)]
pub struct Bus {
    client: redis::Client,
    conn: MultiplexedConnection,
}

impl Bus {
    pub async fn connect(redis_url: &str) -> BusResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { client, conn })
    }

    /// Publish a log event. Best-effort: the caller should log and
    /// continue on error rather than fail the job (spec §4.10).
    pub async fn publish_log(&self, job_id: ResourceId, log: &LogRecord) -> BusResult<()> {
        let envelope = LogEnvelope {
            job_id,
            log: log.clone(),
        };
        let payload = serde_json::to_string(&envelope)?;
        let mut conn = self.conn.clone();
        let _: () = conn.publish(log_channel(job_id), payload).await?;
        Ok(())
    }

    /// Publish a terminal (or intermediate) status event.
    pub async fn publish_status(
        &self,
        job_id: ResourceId,
        status: JobStatus,
        result: Option<JobResult>,
    ) -> BusResult<()> {
        let envelope = StatusEnvelope {
            job_id,
            status,
            result,
        };
        let payload = serde_json::to_string(&envelope)?;
        let mut conn = self.conn.clone();
        let _: () = conn.publish(status_channel(job_id), payload).await?;
        Ok(())
    }

    /// Subscribe to both channels for one job, returning a receiver of
    /// decoded events. The subscription runs on a dedicated connection,
    /// since Redis pub/sub connections can't also issue regular commands.
    pub async fn subscribe_job(&self, job_id: ResourceId) -> BusResult<mpsc::Receiver<BusEvent>> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(log_channel(job_id)).await?;
        pubsub.subscribe(status_channel(job_id)).await?;

        let (tx, rx) = mpsc::channel(256);
        let log_chan = log_channel(job_id);
        let status_chan = status_channel(job_id);

        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let channel: String = msg.get_channel_name().to_string();
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(error = %e, "bus message payload decode failed");
                        continue;
                    }
                };

                let event = if channel == log_chan {
                    serde_json::from_str::<LogEnvelope>(&payload)
                        .ok()
                        .map(|e| BusEvent::Log(e.log))
                } else if channel == status_chan {
                    serde_json::from_str::<StatusEnvelope>(&payload)
                        .ok()
                        .map(|e| BusEvent::Status {
                            status: e.status,
                            result: e.result,
                        })
                } else {
                    None
                };

                if let Some(event) = event {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }
}
