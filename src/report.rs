//! Report rendering
//!
//! Formats a [`DailyResult`] or a whole [`ActivitySession`] for display.
//! Energy is rounded to two decimals here and nowhere else.

use crate::session::ActivitySession;
use crate::types::{DailyResult, TimeWindow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const BAR_WIDTH: usize = 30;

/// Round kilocalories to two decimal places for display
pub fn round_kcal(kcal: f64) -> f64 {
    (kcal * 100.0).round() / 100.0
}

/// One hour row of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourRow {
    pub hour: u32,
    pub steps: u64,
    pub energy_kcal: f64,
}

/// Display form of a daily result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub window: TimeWindow,
    pub total_steps: u64,
    pub total_energy_kcal: f64,
    pub hours: Vec<HourRow>,
}

impl From<&DailyResult> for DailyReport {
    fn from(result: &DailyResult) -> Self {
        let hours = result
            .steps_by_hour
            .iter()
            .zip(result.energy_by_hour.iter())
            .map(|((hour, steps), (_, energy))| HourRow {
                hour,
                steps,
                energy_kcal: round_kcal(energy),
            })
            .collect();

        Self {
            date: result.date,
            window: result.window,
            total_steps: result.total_steps,
            total_energy_kcal: round_kcal(result.total_energy_kcal),
            hours,
        }
    }
}

impl DailyReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text report. With `bars`, each hour gets a step histogram bar.
    pub fn to_text(&self, bars: bool) -> String {
        let peak = self.hours.iter().map(|h| h.steps).max().unwrap_or(0);
        let mut out = format!("Activity for {}\n\nSteps by hour\n", self.date.format("%a %b %d %Y"));

        for row in &self.hours {
            out.push_str(&format!("  {:>2}:00 - {} steps", row.hour, row.steps));
            if bars && peak > 0 {
                let len = (row.steps as f64 / peak as f64 * BAR_WIDTH as f64).round() as usize;
                if len > 0 {
                    out.push_str("  ");
                    out.push_str(&"#".repeat(len));
                }
            }
            out.push('\n');
        }

        out.push_str("\nCalories by hour\n");
        for row in &self.hours {
            out.push_str(&format!("  {:>2}:00 - {:.2} kcal\n", row.hour, row.energy_kcal));
        }

        out.push_str(&format!("\nTotal steps: {} steps\n", self.total_steps));
        out.push_str(&format!("Total calories: {:.2} kcal\n", self.total_energy_kcal));
        out
    }
}

/// Text view of a session: the day's report, granted permissions and errors
pub fn render_session(session: &ActivitySession, bars: bool) -> String {
    let mut out = match session.result() {
        Some(result) => DailyReport::from(result).to_text(bars),
        None => format!(
            "Activity for {}\n\nNo data\n",
            session.current_date().format("%a %b %d %Y")
        ),
    };

    let granted: Vec<&str> = session
        .permissions()
        .iter()
        .map(|p| p.record_type.as_str())
        .collect();
    out.push_str(&format!("Permissions: {}\n", granted.join(", ")));

    if let Some(e) = session.permission_error() {
        out.push_str(&format!("Permission error: {}\n", e));
    }
    if let Some(e) = session.fetch_error() {
        out.push_str(&format!("Fetch error: {}\n", e));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HourlyTotals;
    use crate::window::WindowBuilder;
    use pretty_assertions::assert_eq;

    fn sample_result() -> DailyResult {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let mut steps_by_hour = HourlyTotals::default();
        steps_by_hour.set(7, 500);
        steps_by_hour.set(8, 250);
        let mut energy_by_hour = HourlyTotals::default();
        energy_by_hour.set(7, 33.333_333);
        energy_by_hour.set(8, 12.005);

        DailyResult {
            date,
            window: WindowBuilder::utc().day_window(date),
            total_steps: 750,
            total_energy_kcal: 33.333_333 + 12.005,
            steps_by_hour,
            energy_by_hour,
        }
    }

    #[test]
    fn test_round_kcal() {
        assert_eq!(round_kcal(33.333_333), 33.33);
        assert_eq!(round_kcal(0.0), 0.0);
        assert_eq!(round_kcal(1.999), 2.0);
    }

    #[test]
    fn test_report_rounds_for_display_only() {
        let result = sample_result();
        let report = DailyReport::from(&result);

        assert_eq!(report.hours.len(), 24);
        assert_eq!(report.hours[7].energy_kcal, 33.33);
        assert_eq!(report.total_energy_kcal, 45.34);
        assert_eq!(result.energy_by_hour.get(7), 33.333_333);
    }

    #[test]
    fn test_text_report() {
        let text = DailyReport::from(&sample_result()).to_text(true);

        assert!(text.starts_with("Activity for Mon Jan 15 2024\n"));
        assert!(text.contains("   7:00 - 500 steps  ##############################\n"));
        assert!(text.contains("   8:00 - 250 steps  ###############\n"));
        assert!(text.contains("   0:00 - 0 steps\n"));
        assert!(text.contains("   7:00 - 33.33 kcal\n"));
        assert!(text.contains("Total steps: 750 steps\n"));
        assert!(text.contains("Total calories: 45.34 kcal\n"));
    }

    #[test]
    fn test_json_report() {
        let json = DailyReport::from(&sample_result()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["date"], "2024-01-15");
        assert_eq!(value["total_steps"], 750);
        assert_eq!(value["hours"][7]["steps"], 500);
        assert_eq!(value["window"]["start"], "2024-01-15T00:00:00Z");
    }

    #[test]
    fn test_empty_session() {
        let session = ActivitySession::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        let text = render_session(&session, false);
        assert!(text.contains("No data"));
        assert!(text.contains("Permissions: \n"));
    }

    #[test]
    fn test_text_report_sections_in_order() {
        let text = DailyReport::from(&sample_result()).to_text(false);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2 + 1 + 24 + 1 + 1 + 24 + 1 + 2);
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "Steps by hour");
        assert_eq!(lines[10], "   7:00 - 500 steps");
        assert_eq!(lines[28], "Calories by hour");
        assert_eq!(lines[lines.len() - 1], "Total calories: 45.34 kcal");
        assert!(!text.contains('#'));
    }
}
