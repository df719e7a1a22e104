#[cfg(test)]
mod cron_utils_tests {
    use commander_dispatcher::cron_utils::*;

    use chrono::{DateTime, TimeZone, Timelike, Utc};

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_daily_midnight_rolls_to_next_day() {
        let next = CronExpressionParser::next_after("0 0 * * *", at(1, 10, 0)).unwrap();
        assert_eq!(next, Some(at(2, 0, 0)));
    }

    #[test]
    fn test_step_minutes() {
        let next = CronExpressionParser::next_after("*/15 * * * *", at(1, 10, 7)).unwrap();
        assert_eq!(next, Some(at(1, 10, 15)));
    }

    #[test]
    fn test_next_is_strictly_after_from() {
        let next = CronExpressionParser::next_after("*/15 * * * *", at(1, 10, 15)).unwrap();
        assert_eq!(next, Some(at(1, 10, 30)));

        let with_seconds = Utc.with_ymd_and_hms(2024, 1, 1, 10, 14, 59).unwrap();
        let next = CronExpressionParser::next_after("*/15 * * * *", with_seconds).unwrap();
        assert_eq!(next, Some(at(1, 10, 15)));
    }

    #[test]
    fn test_weekday_and_hour_fields() {
        // 2024-01-01 是星期一
        let next = CronExpressionParser::next_after("0 9 * * 1", at(1, 8, 30)).unwrap();
        assert_eq!(next, Some(at(1, 9, 0)));

        // 星期六出发，24小时内没有星期一
        let next = CronExpressionParser::next_after("0 9 * * 1", at(6, 10, 0)).unwrap();
        assert_eq!(next, None);
    }

    #[test]
    fn test_day_and_weekday_must_both_match() {
        let schedule = CronExpressionParser::parse("0 12 1 * 1").unwrap();
        assert!(schedule.matches(at(1, 12, 0)));

        let schedule = CronExpressionParser::parse("0 12 1 * 2").unwrap();
        assert!(!schedule.matches(at(1, 12, 0)));
        assert_eq!(schedule.next_after(at(1, 0, 0)), None);
    }

    #[test]
    fn test_six_field_expression() {
        let schedule = CronExpressionParser::parse("0 30 * * * *").unwrap();
        let next = schedule.next_after(at(1, 10, 0)).unwrap();
        assert_eq!(next, at(1, 10, 30));
        assert_eq!(next.second(), 0);

        let schedule = CronExpressionParser::parse("0,30 */20 * * * *").unwrap();
        assert_eq!(schedule.next_after(at(1, 10, 0)).unwrap(), at(1, 10, 20));

        // 秒字段不含0的表达式永远落不到分钟边界，解析时直接拒绝
        assert!(CronExpressionParser::parse("30 * * * * *").is_err());
        assert!(CronExpressionParser::parse("10-50 * * * * *").is_err());
        assert!(CronExpressionParser::next_after("*/15 * * * * *", at(1, 10, 0)).is_ok());
    }

    #[test]
    fn test_upcoming_times() {
        let schedule = CronExpressionParser::parse("0 */6 * * *").unwrap();
        let upcoming = schedule.upcoming(at(1, 1, 0), 3);
        assert_eq!(upcoming, vec![at(1, 6, 0), at(1, 12, 0), at(1, 18, 0)]);
    }

    #[test]
    fn test_ranges_and_lists() {
        let schedule = CronExpressionParser::parse("0,30 9-17 * * 1-5").unwrap();
        assert_eq!(schedule.minutes().len(), 2);
        assert_eq!(schedule.hours().len(), 9);
        assert!(schedule.matches(at(2, 17, 30)));
        assert!(!schedule.matches(at(6, 10, 0)));

        let schedule = CronExpressionParser::parse("5-20/5 * * * *").unwrap();
        assert_eq!(
            schedule.minutes().iter().copied().collect::<Vec<_>>(),
            vec![5, 10, 15, 20]
        );
    }

    #[test]
    fn test_no_match_within_horizon() {
        let next = CronExpressionParser::next_after("0 0 31 2 *", at(1, 0, 0)).unwrap();
        assert_eq!(next, None);
    }

    #[test]
    fn test_validate_cron_expression() {
        assert!(CronExpressionParser::validate("0 0 * * *").is_ok());
        assert!(CronExpressionParser::validate("0 */5 * * * *").is_ok());
        assert!(CronExpressionParser::validate("0 9-17 * * 1-5").is_ok());
        assert!(CronExpressionParser::validate("invalid").is_err());
        assert!(CronExpressionParser::validate("0 0 32 * *").is_err());
        assert!(CronExpressionParser::validate("60 * * * *").is_err());
        assert!(CronExpressionParser::validate("* * * * 7").is_err());
        assert!(CronExpressionParser::validate("*/0 * * * *").is_err());
        assert!(CronExpressionParser::validate("10-5 * * * *").is_err());
        assert!(CronExpressionParser::validate("").is_err());
        assert!(CronExpressionParser::validate("30 0 * * * *").is_err());
        assert!(CronExpressionParser::next_after("* * *", at(1, 0, 0)).is_err());
    }
}
