use chrono::{Local, NaiveDateTime};

/// Number of decimal places shown for pay amounts.
pub const PAY_DECIMALS: usize = 2;

pub fn format_pay(amount: f64) -> String {
	format!("{:.*}", PAY_DECIMALS, amount)
}

/// Render a server timestamp (naive UTC) in the local timezone.
pub fn format_timestamp(timestamp: Option<NaiveDateTime>) -> String {
	match timestamp {
		Some(ts) => ts
			.and_utc()
			.with_timezone(&Local)
			.format("%Y-%m-%d %H:%M:%S")
			.to_string(),
		None => "-".to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_format_pay() {
		assert_eq!(format_pay(36.0), "36.00");
		assert_eq!(format_pay(4.5), "4.50");
		assert_eq!(format_pay(-1.5), "-1.50");
	}

	#[test]
	fn test_format_missing_timestamp() {
		assert_eq!(format_timestamp(None), "-");
	}
}
