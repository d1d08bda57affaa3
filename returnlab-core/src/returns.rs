//! Daily percentage returns from a canonical price series.

use crate::domain::{DailyReturn, PriceSeries, ReturnPoint, ReturnSeries};

/// Percentage change from `prev` to `curr`, or `Undefined` when `prev` is zero.
pub fn pct_change(prev: f64, curr: f64) -> DailyReturn {
    if prev == 0.0 {
        return DailyReturn::Undefined;
    }
    DailyReturn::from_value((curr - prev) / prev * 100.0)
}

/// Compute the daily return series.
///
/// Output is aligned 1:1 with the input: element 0 is always `Undefined`
/// (no prior close), and element `i` is `(close[i] - close[i-1]) / close[i-1] * 100`
/// unless `close[i-1]` is zero, in which case it is `Undefined` as well.
pub fn compute_returns(series: &PriceSeries) -> ReturnSeries {
    let points = series.points();
    let mut out = Vec::with_capacity(points.len());

    for (i, p) in points.iter().enumerate() {
        let value = if i == 0 {
            DailyReturn::Undefined
        } else {
            pct_change(points[i - 1].close, p.close)
        };
        out.push(ReturnPoint {
            date: p.date,
            value,
        });
    }

    ReturnSeries::from_points(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PricePoint;
    use chrono::NaiveDate;

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points = closes
            .iter()
            .zip(start.iter_days())
            .map(|(&c, date)| PricePoint::new(date, c))
            .collect();
        PriceSeries::try_new(points).unwrap()
    }

    fn values(returns: &ReturnSeries) -> Vec<DailyReturn> {
        returns.iter().map(|p| p.value).collect()
    }

    #[test]
    fn up_then_down_ten_percent() {
        let r = compute_returns(&series(&[100.0, 110.0, 99.0]));
        assert_eq!(r.len(), 3);
        assert_eq!(r.points()[0].value, DailyReturn::Undefined);
        let v1 = r.points()[1].value.value().unwrap();
        let v2 = r.points()[2].value.value().unwrap();
        assert!((v1 - 10.0).abs() < 1e-9);
        assert!((v2 + 10.0).abs() < 1e-9);
    }

    #[test]
    fn zero_prior_close_is_undefined() {
        let r = compute_returns(&series(&[0.0, 50.0]));
        assert_eq!(values(&r), vec![DailyReturn::Undefined, DailyReturn::Undefined]);
        assert_eq!(r.defined_count(), 0);
    }

    #[test]
    fn zero_current_close_is_minus_hundred() {
        let r = compute_returns(&series(&[50.0, 0.0, 10.0]));
        assert_eq!(r.points()[1].value, DailyReturn::Percent(-100.0));
        assert_eq!(r.points()[2].value, DailyReturn::Undefined);
    }

    #[test]
    fn empty_and_single_point() {
        assert!(compute_returns(&PriceSeries::empty()).is_empty());
        let r = compute_returns(&series(&[42.0]));
        assert_eq!(values(&r), vec![DailyReturn::Undefined]);
    }

    #[test]
    fn dates_are_preserved() {
        let s = series(&[1.0, 2.0, 3.0]);
        let r = compute_returns(&s);
        let price_dates: Vec<_> = s.iter().map(|p| p.date).collect();
        let return_dates: Vec<_> = r.iter().map(|p| p.date).collect();
        assert_eq!(price_dates, return_dates);
    }

    #[test]
    fn flat_prices_give_zero_not_undefined() {
        let r = compute_returns(&series(&[5.0, 5.0]));
        assert_eq!(r.points()[1].value, DailyReturn::Percent(0.0));
    }
}
