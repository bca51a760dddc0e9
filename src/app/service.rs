use super::config::{Config, SendMode};
use crate::buffer::chunk_size;
use crate::collector::InputParser;
use crate::domain::{DataPoint, ForwarderError, ResultCode, SendResult};
use crate::reliability::SentLedger;
use crate::sender::{SendStatsSnapshot, TcpTransport, TrapSender, TrapTransport};
use tracing::{debug, info, warn};

/// Outcome of one forwarding run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub results: Vec<SendResult>,
    /// Points handed to the sender after ledger filtering.
    pub points_sent: usize,
    /// Points skipped because the ledger already had them.
    pub skipped: usize,
    pub stats: SendStatsSnapshot,
}

impl RunReport {
    /// 0 when every round trip succeeded, else the code of the first failure.
    pub fn exit_code(&self) -> i32 {
        self.results
            .iter()
            .find(|r| !r.is_ok())
            .map_or(0, |r| i32::from(r.code.code()))
    }

    pub fn first_failure(&self) -> Option<ResultCode> {
        self.results.iter().map(|r| r.code).find(|c| !c.is_ok())
    }
}

/// Gathers points from the configured sources and forwards them once.
pub struct ForwardingService<T: TrapTransport = TcpTransport> {
    config: Config,
    sender: TrapSender<T>,
    ledger: Option<SentLedger>,
}

impl ForwardingService<TcpTransport> {
    pub fn new(config: Config) -> Result<Self, ForwarderError> {
        let sender = TrapSender::new(config.sender_config())?;
        Ok(Self::with_sender(config, sender))
    }
}

impl<T: TrapTransport> ForwardingService<T> {
    pub fn with_sender(config: Config, sender: TrapSender<T>) -> Self {
        let ledger = config.sent_log.as_ref().map(SentLedger::new);
        Self {
            config,
            sender,
            ledger,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Points from the input file followed by the `--key/--value` point.
    pub async fn collect(&self) -> Result<Vec<DataPoint>, ForwarderError> {
        let host = self.config.resolved_host()?;
        let mut points = Vec::new();

        if let Some(path) = &self.config.input_file {
            let parser = InputParser::new(host.clone(), self.config.with_timestamps);
            points.extend(parser.read_path(path).await?);
            debug!("Read {} point(s) from {}", points.len(), path.display());
        }

        if let (Some(key), Some(value)) = (&self.config.key, &self.config.value) {
            let point = DataPoint::new(host, key.clone(), value.clone(), self.config.clock)
                .map_err(crate::sender::SenderError::from)?;
            points.push(point);
        }

        Ok(points)
    }

    pub async fn run(&mut self) -> Result<RunReport, ForwarderError> {
        let collected = self.collect().await?;
        let total = collected.len();

        let pending = match &self.ledger {
            Some(ledger) => ledger.filter_undelivered(collected).await?,
            None => collected,
        };
        let skipped = total - pending.len();
        if let Some(ledger) = self.ledger.as_ref().filter(|_| skipped > 0) {
            info!(
                "Skipping {} point(s) already in {}",
                skipped,
                ledger.path().display()
            );
        }

        self.sender.clear_data();
        for point in pending {
            self.sender.add_point(point)?;
        }
        let points_sent = self.sender.data_len();

        let (results, delivered) = match self.config.mode {
            SendMode::Batch => self.send_batched().await?,
            SendMode::OneByOne => self.send_one_by_one().await?,
        };

        if let Some(ledger) = &self.ledger {
            ledger.record(&delivered).await?;
            if !results.is_empty() {
                ledger.append_results(&results).await?;
            }
            ledger.purge(self.config.sent_log_keep).await?;
        }

        let sender_stats = self.sender.stats();
        let stats = sender_stats.snapshot();
        let report = RunReport {
            results,
            points_sent,
            skipped,
            stats,
        };

        match report.first_failure() {
            None => info!(
                "Forwarded {} point(s) in {} round trip(s)",
                points_sent,
                report.results.len()
            ),
            Some(code) => warn!(
                "Forwarding finished with failures: {}/{} round trip(s) ok ({:.0}%), first failure {}",
                report.stats.ok,
                report.stats.round_trips,
                sender_stats.success_rate() * 100.0,
                code
            ),
        }

        Ok(report)
    }

    async fn send_batched(&self) -> Result<(Vec<SendResult>, Vec<DataPoint>), ForwarderError> {
        let max = self.config.max_per_connection;
        let results = self
            .sender
            .send_data(self.config.effective_packet_clock(), max)
            .await?;

        let points = self.sender.get_data();
        let delivered = points
            .chunks(chunk_size(points.len(), max))
            .zip(&results)
            .filter(|(_, result)| result.is_ok())
            .flat_map(|(chunk, _)| chunk.iter().cloned())
            .collect();

        Ok((results, delivered))
    }

    async fn send_one_by_one(&self) -> Result<(Vec<SendResult>, Vec<DataPoint>), ForwarderError> {
        let mut results = Vec::new();
        let mut delivered = Vec::new();

        for (result, point) in self.sender.send_data_one_by_one().await? {
            if result.is_ok() {
                delivered.push(point);
            }
            results.push(result);
        }

        Ok((results, delivered))
    }
}
