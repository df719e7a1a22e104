use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, DurationRound, Timelike, Utc};
use tracing::debug;

use commander_core::{CronError, SchedulerError, SchedulerResult};

/// 向后扫描的最大分钟数（24小时）
pub const SCAN_HORIZON_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, Copy)]
struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
}

const SECOND: FieldSpec = FieldSpec {
    name: "second",
    min: 0,
    max: 59,
};
const MINUTE: FieldSpec = FieldSpec {
    name: "minute",
    min: 0,
    max: 59,
};
const HOUR: FieldSpec = FieldSpec {
    name: "hour",
    min: 0,
    max: 23,
};
const DAY: FieldSpec = FieldSpec {
    name: "day",
    min: 1,
    max: 31,
};
const MONTH: FieldSpec = FieldSpec {
    name: "month",
    min: 1,
    max: 12,
};
const WEEKDAY: FieldSpec = FieldSpec {
    name: "weekday",
    min: 0,
    max: 6,
};

/// CRON表达式解析工具
///
/// 支持5个字段（分 时 日 月 周）或6个字段（前置秒）。每个字段可以是
/// `*`、单个值、逗号列表、范围 `a-b` 以及步长 `*/n`、`a-b/n`、`a/n`。
/// 星期取值0-6，0表示星期日。
pub struct CronExpressionParser;

impl CronExpressionParser {
    pub fn parse(expr: &str) -> Result<CronSchedule, CronError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let (seconds, rest) = match fields.len() {
            5 => (BTreeSet::from([0]), &fields[..]),
            6 => {
                let seconds = parse_field(fields[0], SECOND)?;
                // 扫描只落在整分钟上
                if !seconds.contains(&0) {
                    return Err(CronError::UnreachableSeconds {
                        value: fields[0].to_string(),
                    });
                }
                (seconds, &fields[1..])
            }
            found => return Err(CronError::BadFieldCount { found }),
        };

        Ok(CronSchedule {
            expression: expr.trim().to_string(),
            seconds,
            minutes: parse_field(rest[0], MINUTE)?,
            hours: parse_field(rest[1], HOUR)?,
            days: parse_field(rest[2], DAY)?,
            months: parse_field(rest[3], MONTH)?,
            weekdays: parse_field(rest[4], WEEKDAY)?,
        })
    }

    /// 计算 `from` 之后第一个匹配的时间点，24小时内没有匹配时返回 `None`
    pub fn next_after(expr: &str, from: DateTime<Utc>) -> SchedulerResult<Option<DateTime<Utc>>> {
        let schedule =
            Self::parse(expr).map_err(|e| SchedulerError::invalid_cron(expr, e))?;
        Ok(schedule.next_after(from))
    }

    /// 验证CRON表达式是否有效
    pub fn validate(expr: &str) -> SchedulerResult<()> {
        Self::parse(expr)
            .map(|_| ())
            .map_err(|e| SchedulerError::invalid_cron(expr, e))
    }
}

/// 解析后的CRON表达式，每个字段保存候选值集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    expression: String,
    seconds: BTreeSet<u32>,
    minutes: BTreeSet<u32>,
    hours: BTreeSet<u32>,
    days: BTreeSet<u32>,
    months: BTreeSet<u32>,
    weekdays: BTreeSet<u32>,
}

impl CronSchedule {
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn minutes(&self) -> &BTreeSet<u32> {
        &self.minutes
    }

    pub fn hours(&self) -> &BTreeSet<u32> {
        &self.hours
    }

    /// 检查给定时间的所有字段是否都在候选集合内
    pub fn matches(&self, time: DateTime<Utc>) -> bool {
        self.seconds.contains(&time.second())
            && self.minutes.contains(&time.minute())
            && self.hours.contains(&time.hour())
            && self.days.contains(&time.day())
            && self.months.contains(&time.month())
            && self.weekdays.contains(&time.weekday().num_days_from_sunday())
    }

    /// 从 `from` 截断到分钟后的下一分钟开始逐分钟扫描
    pub fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = from.duration_trunc(Duration::minutes(1)).ok()? + Duration::minutes(1);

        let next = (0..SCAN_HORIZON_MINUTES)
            .map(|offset| start + Duration::minutes(offset))
            .find(|candidate| self.matches(*candidate));

        if next.is_none() {
            debug!(
                "CRON表达式 {} 在 {} 之后24小时内没有匹配的时间",
                self.expression,
                from.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        next
    }

    /// 获取从指定时间开始的多个执行时间
    pub fn upcoming(&self, from: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        let mut times = Vec::with_capacity(count);
        let mut cursor = from;
        while times.len() < count {
            match self.next_after(cursor) {
                Some(next) => {
                    times.push(next);
                    cursor = next;
                }
                None => break,
            }
        }
        times
    }
}

fn parse_field(text: &str, spec: FieldSpec) -> Result<BTreeSet<u32>, CronError> {
    let mut values = BTreeSet::new();

    for part in text.split(',') {
        if part.is_empty() {
            return Err(CronError::InvalidValue {
                field: spec.name,
                value: text.to_string(),
            });
        }

        let (range, step) = match part.split_once('/') {
            Some((range, step)) => (range, Some(parse_step(step, spec)?)),
            None => (part, None),
        };

        let (start, end) = if range == "*" {
            (spec.min, spec.max)
        } else if let Some((start, end)) = range.split_once('-') {
            let start = parse_value(start, spec)?;
            let end = parse_value(end, spec)?;
            if start > end {
                return Err(CronError::InvalidRange {
                    field: spec.name,
                    start,
                    end,
                });
            }
            (start, end)
        } else {
            let value = parse_value(range, spec)?;
            match step {
                Some(_) => (value, spec.max),
                None => (value, value),
            }
        };

        values.extend((start..=end).step_by(step.unwrap_or(1) as usize));
    }

    Ok(values)
}

fn parse_value(text: &str, spec: FieldSpec) -> Result<u32, CronError> {
    let value: u32 = text.parse().map_err(|_| CronError::InvalidValue {
        field: spec.name,
        value: text.to_string(),
    })?;
    if value < spec.min || value > spec.max {
        return Err(CronError::OutOfRange {
            field: spec.name,
            value,
            min: spec.min,
            max: spec.max,
        });
    }
    Ok(value)
}

fn parse_step(text: &str, spec: FieldSpec) -> Result<u32, CronError> {
    match text.parse::<u32>() {
        Ok(step) if step > 0 => Ok(step),
        _ => Err(CronError::InvalidStep {
            field: spec.name,
            step: text.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_field_forms() {
        let schedule = CronExpressionParser::parse("0,30 9-17/4 * * 1-5").unwrap();
        assert_eq!(schedule.minutes(), &BTreeSet::from([0, 30]));
        assert_eq!(schedule.hours(), &BTreeSet::from([9, 13, 17]));
    }

    #[test]
    fn test_value_with_step_runs_to_max() {
        let schedule = CronExpressionParser::parse("50/5 * * * *").unwrap();
        assert_eq!(schedule.minutes(), &BTreeSet::from([50, 55]));
    }

    #[test]
    fn test_weekday_zero_is_sunday() {
        let schedule = CronExpressionParser::parse("0 12 * * 0").unwrap();
        // 2024-01-07 是星期日
        let sunday = Utc.with_ymd_and_hms(2024, 1, 7, 12, 0, 0).unwrap();
        let monday = Utc.with_ymd_and_hms(2024, 1, 8, 12, 0, 0).unwrap();
        assert!(schedule.matches(sunday));
        assert!(!schedule.matches(monday));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            CronExpressionParser::parse("* * *"),
            Err(CronError::BadFieldCount { found: 3 })
        );
        assert!(matches!(
            CronExpressionParser::parse("60 * * * *"),
            Err(CronError::OutOfRange { field: "minute", value: 60, .. })
        ));
        assert!(matches!(
            CronExpressionParser::parse("* * * 13 *"),
            Err(CronError::OutOfRange { field: "month", .. })
        ));
        assert!(matches!(
            CronExpressionParser::parse("*/0 * * * *"),
            Err(CronError::InvalidStep { .. })
        ));
        assert!(matches!(
            CronExpressionParser::parse("30-10 * * * *"),
            Err(CronError::InvalidRange { start: 30, end: 10, .. })
        ));
        assert!(matches!(
            CronExpressionParser::parse("a * * * *"),
            Err(CronError::InvalidValue { .. })
        ));
        assert!(matches!(
            CronExpressionParser::parse("1,,2 * * * *"),
            Err(CronError::InvalidValue { .. })
        ));
        assert_eq!(
            CronExpressionParser::parse("30 * * * * *"),
            Err(CronError::UnreachableSeconds {
                value: "30".to_string()
            })
        );
    }
}
