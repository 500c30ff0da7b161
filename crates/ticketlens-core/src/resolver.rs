//! Query time-window resolution
//!
//! Rules are tried in priority order and the first applicable one wins:
//! explicit bounds, ticket/email times, problem times, then a default
//! trailing window. Only the min and max of each time set matter.

use chrono::{DateTime, Duration, FixedOffset};
use tracing::debug;

use crate::config::Settings;
use crate::error::Result;
use crate::time;
use crate::types::{TicketInfo, TimeWindow};

/// Bounds supplied by the caller, either or both optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExplicitRange {
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone)]
pub struct TimeRangeResolver {
    expansion_hours: i64,
    default_range_hours: i64,
    offset: FixedOffset,
}

impl TimeRangeResolver {
    pub fn new(expansion_hours: i64, default_range_hours: i64, offset: FixedOffset) -> Self {
        Self {
            expansion_hours,
            default_range_hours,
            offset,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            settings.expansion_hours,
            settings.default_range_hours,
            settings.offset()?,
        ))
    }

    pub fn resolve(
        &self,
        info: &TicketInfo,
        explicit: &ExplicitRange,
        now: DateTime<FixedOffset>,
    ) -> TimeWindow {
        let now = now.with_timezone(&self.offset);
        let expansion = Duration::hours(self.expansion_hours);
        let default_range = Duration::hours(self.default_range_hours);

        match (explicit.start, explicit.end) {
            (Some(start), Some(end)) => {
                debug!(rule = "explicit", "time window from caller bounds");
                return self.window(start, end, "命令行参数指定");
            }
            (Some(start), None) => {
                debug!(rule = "explicit_start", "time window from caller start");
                return self.window(start, now, "命令行参数指定（结束时间取当前时间）");
            }
            (None, Some(end)) => {
                debug!(rule = "explicit_end", "time window from caller end");
                let source = format!(
                    "命令行参数指定（开始时间取结束前{}小时）",
                    self.default_range_hours
                );
                return self.window(end - default_range, end, &source);
            }
            (None, None) => {}
        }

        let reported: Vec<DateTime<FixedOffset>> = info
            .time_info
            .ticket_times
            .iter()
            .chain(info.time_info.email_times.iter())
            .copied()
            .collect();

        let (start, end, source) = if let Some((min, max)) = bounds(&reported) {
            debug!(rule = "ticket_email", signals = reported.len(), "time window from reported times");
            (
                min - expansion,
                max + expansion,
                format!(
                    "工单/邮件时间（{}）前后{}小时",
                    self.describe(min, max),
                    self.expansion_hours
                ),
            )
        } else if let Some((min, max)) = bounds(&info.time_info.problem_times) {
            debug!(rule = "problem", "time window from problem times");
            (
                min - expansion,
                max + expansion,
                format!(
                    "问题发生时间（{}）前后{}小时",
                    self.describe(min, max),
                    self.expansion_hours
                ),
            )
        } else {
            debug!(rule = "default", "no time signals, using trailing window");
            (
                now - default_range,
                now,
                format!("默认：最近{}小时", self.default_range_hours),
            )
        };

        if end > now {
            debug!("window end is in the future, clamping to now");
            let start = start.min(now - expansion);
            return self.window(start, now, &format!("{}，结束时间已截断至当前时间", source));
        }

        self.window(start, end, &source)
    }

    fn window(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        source: &str,
    ) -> TimeWindow {
        TimeWindow::new(
            start.with_timezone(&self.offset),
            end.with_timezone(&self.offset),
            source,
        )
    }

    fn describe(&self, min: DateTime<FixedOffset>, max: DateTime<FixedOffset>) -> String {
        let min = time::display(&min.with_timezone(&self.offset));
        if min == time::display(&max.with_timezone(&self.offset)) {
            min
        } else {
            format!("{} ~ {}", min, time::display(&max.with_timezone(&self.offset)))
        }
    }
}

fn bounds(times: &[DateTime<FixedOffset>]) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let min = times.iter().min()?;
    let max = times.iter().max()?;
    Some((*min, *max))
}
