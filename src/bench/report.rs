//! Progress and final report rendering.

use super::counters::Snapshot;
use super::plan::ClientPlan;
use super::BenchConfig;
use std::io::{self, Write};
use std::time::Duration;

/// One line of the cumulative latency distribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramLine {
    /// Share of completed requests below the bucket's upper bound, in percent
    pub percent: f64,
    /// Bucket label: requests finished in at most this many whole milliseconds
    pub millis: u64,
}

/// Cumulative latency distribution over every completed request.
///
/// Thresholds advance one millisecond at a time. A line is emitted only when
/// the cumulative ratio changes at 0.01% resolution, so runs of empty
/// buckets collapse away. The last line is always 100%.
pub fn histogram(plans: &[ClientPlan]) -> Vec<HistogramLine> {
    let mut sorted: Vec<Duration> = plans
        .iter()
        .flat_map(|plan| plan.latencies.iter().flatten().copied())
        .collect();
    sorted.sort_unstable();

    let mut lines = Vec::new();
    let total = sorted.len();
    if total == 0 {
        return lines;
    }

    let mut last = 0.0f64;
    let mut limit_ms: u64 = 1;
    loop {
        let limit = Duration::from_millis(limit_ms);
        let hits = sorted.partition_point(|d| *d < limit);
        let ratio = hits as f64 / total as f64;

        if (ratio * 10000.0).floor() != (last * 10000.0).floor() {
            last = ratio;
            lines.push(HistogramLine {
                percent: ratio * 100.0,
                millis: limit_ms - 1,
            });
        }
        if hits == total {
            break;
        }

        // No threshold before the next latency's millisecond can change the ratio
        let next = sorted[hits].as_millis() as u64 + 1;
        limit_ms = next.max(limit_ms + 1);
    }

    lines
}

/// Live one-line progress, rewritten in place
pub fn write_progress<W: Write + ?Sized>(out: &mut W, name: &str, rate: f64) -> io::Result<()> {
    write!(out, "\r{}: {:.2}\r", name, rate)?;
    out.flush()
}

/// Everything the final report is rendered from
pub struct Report<'a> {
    pub name: &'a str,
    pub config: &'a BenchConfig,
    pub snapshot: &'a Snapshot,
    pub plans: &'a [ClientPlan],
}

impl Report<'_> {
    /// Render in the configured style: CSV, quiet or full
    pub fn write<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        if self.config.csv {
            self.write_csv(out)?;
        } else if self.config.quiet {
            self.write_quiet(out)?;
        } else {
            self.write_full(out)?;
        }
        out.flush()
    }

    fn rate(&self) -> f64 {
        self.snapshot.rate()
    }

    fn write_csv<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "\"{}\",\"{:.2}\"", self.name, self.rate())
    }

    fn write_quiet<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "\r{}: {:.2} requests per second", self.name, self.rate())
    }

    fn write_full<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        let payload_per_request = match self.config.requests {
            0 => 0,
            n => self.snapshot.payload_bytes / n as u64,
        };

        write!(out, "\r{}: {:.2}", self.name, self.rate())?;
        writeln!(out, "\r====== {} ======", self.name)?;
        writeln!(
            out,
            "  {} requests completed in {:.2} seconds",
            self.config.requests,
            self.snapshot.last_completion.as_secs_f64()
        )?;
        writeln!(out, "  {} parallel clients", self.config.clients)?;
        writeln!(out, "  {} bytes payload", payload_per_request)?;
        writeln!(out, "  keep alive: 1")?;
        writeln!(out)?;

        for line in histogram(self.plans) {
            writeln!(out, "{:.2}% <= {} milliseconds", line.percent, line.millis)?;
        }

        writeln!(out, "{:.2} requests per second", self.rate())?;
        writeln!(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_with(latencies: &[Option<u64>]) -> ClientPlan {
        ClientPlan {
            client: 0,
            latencies: latencies
                .iter()
                .map(|l| l.map(Duration::from_micros))
                .collect(),
        }
    }

    fn render(config: &BenchConfig, snapshot: &Snapshot, plans: &[ClientPlan]) -> String {
        let report = Report {
            name: "SET",
            config,
            snapshot,
            plans,
        };
        let mut out = Vec::new();
        report.write(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_histogram_collapses_empty_buckets() {
        let plans = vec![plan_with(&[Some(200), Some(300), Some(1_500), Some(7_200)])];
        let lines = histogram(&plans);
        assert_eq!(
            lines,
            vec![
                HistogramLine { percent: 50.0, millis: 0 },
                HistogramLine { percent: 75.0, millis: 1 },
                HistogramLine { percent: 100.0, millis: 7 },
            ]
        );
    }

    #[test]
    fn test_histogram_ignores_unset_slots() {
        let plans = vec![
            plan_with(&[Some(2_500), None, None]),
            plan_with(&[None, Some(2_600)]),
        ];
        let lines = histogram(&plans);
        assert_eq!(lines, vec![HistogramLine { percent: 100.0, millis: 2 }]);
    }

    #[test]
    fn test_histogram_monotonic_and_complete() {
        let latencies: Vec<Option<u64>> = (0..500u64).map(|i| Some(i * 37 % 9_000 + 150)).collect();
        let plans = vec![plan_with(&latencies)];
        let min_ms = latencies.iter().flatten().min().unwrap() / 1000;

        let lines = histogram(&plans);
        assert!(lines.windows(2).all(|w| w[0].percent <= w[1].percent));
        assert!(lines.windows(2).all(|w| w[0].millis < w[1].millis));
        assert_eq!(lines.last().unwrap().percent, 100.0);
        // Nothing is reported below the fastest request
        assert!(lines[0].millis >= min_ms);
    }

    #[test]
    fn test_histogram_empty() {
        assert!(histogram(&[plan_with(&[None, None])]).is_empty());
        assert!(histogram(&[]).is_empty());
    }

    #[test]
    fn test_csv_report() {
        let config = BenchConfig {
            csv: true,
            ..Default::default()
        };
        let snapshot = Snapshot {
            completed: 1_234_567,
            last_completion: Duration::from_secs(100),
            ..Default::default()
        };
        assert_eq!(render(&config, &snapshot, &[]), "\"SET\",\"12345.67\"\n");
    }

    #[test]
    fn test_quiet_report() {
        let config = BenchConfig {
            quiet: true,
            ..Default::default()
        };
        let snapshot = Snapshot {
            completed: 1000,
            last_completion: Duration::from_millis(500),
            ..Default::default()
        };
        assert_eq!(
            render(&config, &snapshot, &[]),
            "\rSET: 2000.00 requests per second\n"
        );
    }

    #[test]
    fn test_full_report() {
        let config = BenchConfig {
            requests: 4,
            clients: 2,
            ..Default::default()
        };
        let snapshot = Snapshot {
            payload_bytes: 4 * 31,
            completed: 4,
            last_completion: Duration::from_millis(2),
            ..Default::default()
        };
        let plans = vec![
            plan_with(&[Some(400), Some(400)]),
            plan_with(&[Some(1_200), Some(1_200)]),
        ];

        let expected = "\rSET: 2000.00\r====== SET ======\n\
                        \x20 4 requests completed in 0.00 seconds\n\
                        \x20 2 parallel clients\n\
                        \x20 31 bytes payload\n\
                        \x20 keep alive: 1\n\
                        \n\
                        50.00% <= 0 milliseconds\n\
                        100.00% <= 1 milliseconds\n\
                        2000.00 requests per second\n\
                        \n";
        assert_eq!(render(&config, &snapshot, &plans), expected);
    }

    #[test]
    fn test_progress_line() {
        let mut out = Vec::new();
        write_progress(&mut out, "GET", 1234.5).unwrap();
        assert_eq!(out, b"\rGET: 1234.50\r");
    }
}
