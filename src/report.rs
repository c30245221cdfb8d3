//! Plain-text reports for the command line

use crate::engine::{HybridMetrics, MetricsRecord};
use crate::hybrid::AcidBathResult;
use crate::race::RaceProjection;
use crate::zones::{BenchmarkMetric, BenchmarkRating, TrainingZone};
use chrono::{DateTime, Utc};
use std::io::{self, Write};
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Speed (km/h)")]
    speed: String,
    #[tabled(rename = "Pace (min/km)")]
    pace: String,
    #[tabled(rename = "Heart rate (bpm)")]
    heart_rate: String,
}

#[derive(Tabled)]
struct RaceRow {
    #[tabled(rename = "Distance")]
    distance: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Pace (min/km)")]
    pace: String,
    #[tabled(rename = "Level model")]
    level_time: String,
}

#[derive(Tabled)]
struct BenchmarkRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Tier")]
    tier: String,
}

/// Format a speed in km/h as a `m:ss` pace per kilometer
pub fn format_pace(speed_kmh: f64) -> String {
    if !speed_kmh.is_finite() || speed_kmh <= 0.1 {
        return "-:--".to_string();
    }
    let total_seconds = (3600.0 / speed_kmh).round() as u64;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Format seconds as `h:mm:ss`, or `m:ss` under an hour
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "-:--".to_string();
    }
    let total = seconds.round() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

fn format_distance(distance_m: f64) -> String {
    match distance_m as u64 {
        21_097 => "Half marathon".to_string(),
        42_195 => "Marathon".to_string(),
        m if m % 1000 == 0 => format!("{} km", m / 1000),
        m => format!("{} m", m),
    }
}

fn metric_label(metric: BenchmarkMetric) -> &'static str {
    match metric {
        BenchmarkMetric::Vo2Max => "VO2max (ml/kg/min)",
        BenchmarkMetric::Lt2Speed => "LT2 speed (km/h)",
        BenchmarkMetric::FatMaxSpeed => "FatMax speed (km/h)",
        BenchmarkMetric::SpeedTax => "Speed tax (mmol/L per km/h)",
        BenchmarkMetric::Resilience => "Resilience",
    }
}

fn range(min: f64, max: Option<f64>, precision: usize) -> String {
    match max {
        Some(max) => format!("{:.p$} - {:.p$}", min, max, p = precision),
        None => format!("> {:.p$}", min, p = precision),
    }
}

pub fn zone_table(zones: &[TrainingZone]) -> String {
    let rows = zones.iter().map(|z| ZoneRow {
        zone: z.name.as_str().to_string(),
        speed: range(z.speed_min, z.speed_max, 1),
        pace: match z.speed_max {
            Some(max) => format!("{} - {}", format_pace(z.speed_min), format_pace(max)),
            None => format!("< {}", format_pace(z.speed_min)),
        },
        heart_rate: range(z.heart_rate_min, z.heart_rate_max, 0),
    });
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Riegel projections with the level-model time for the same distance alongside
pub fn race_table(projections: &[RaceProjection], level_projections: &[RaceProjection]) -> String {
    let rows = projections.iter().map(|p| RaceRow {
        distance: format_distance(p.distance_m),
        time: format_duration(p.time_s),
        pace: format_pace(60.0 / p.pace_min_per_km),
        level_time: level_projections
            .iter()
            .find(|l| (l.distance_m - p.distance_m).abs() < 0.5)
            .map_or_else(|| "-".to_string(), |l| format_duration(l.time_s)),
    });
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn benchmark_table(ratings: &[BenchmarkRating]) -> String {
    let rows = ratings.iter().map(|r| BenchmarkRow {
        metric: metric_label(r.metric).to_string(),
        value: format!("{:.2}", r.value),
        tier: r.tier.as_str().to_string(),
    });
    Table::new(rows).with(Style::rounded()).to_string()
}

fn write_header<W: Write>(out: &mut W, title: &str, generated_at: DateTime<Utc>) -> io::Result<()> {
    writeln!(out, "{}", title)?;
    writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(out)
}

/// Full report of a standard analysis
pub fn write_metrics_report<W: Write>(
    out: &mut W,
    record: &MetricsRecord,
    generated_at: DateTime<Utc>,
) -> io::Result<()> {
    let t = &record.thresholds;
    write_header(out, "LACTATE STEP TEST", generated_at)?;

    writeln!(out, "THRESHOLDS ({})", t.method.as_str())?;
    writeln!(
        out,
        "LT1: {:.2} km/h ({} min/km) @ {:.0} bpm, {:.2} mmol/L",
        t.lt1_speed,
        format_pace(t.lt1_speed),
        t.lt1_heart_rate,
        t.lt1_lactate
    )?;
    writeln!(
        out,
        "LT2: {:.2} km/h ({} min/km) @ {:.0} bpm, {:.2} mmol/L",
        t.lt2_speed,
        format_pace(t.lt2_speed),
        t.lt2_heart_rate,
        t.lt2_lactate
    )?;
    writeln!(out, "Baseline lactate: {:.2} mmol/L", t.baseline_lactate)?;
    if t.fallback_applied {
        writeln!(out, "Note: LT2 fell back to the fixed-offset method")?;
    }
    writeln!(out)?;

    writeln!(out, "METABOLISM")?;
    writeln!(out, "Type: {} (VLaMax score {:.2})", record.metabolic_type, record.vla_max_score)?;
    writeln!(out, "Glycolytic slope: {:.3}", record.glycolytic_slope)?;
    writeln!(
        out,
        "FatMax: {:.2} km/h @ {:.0} bpm",
        record.fat_max_speed, record.fat_max_heart_rate
    )?;
    writeln!(out, "VO2max: {:.1} ml/kg/min ({:?})", record.vo2max, record.vo2max_method)?;
    writeln!(out)?;

    writeln!(out, "RESILIENCE")?;
    writeln!(
        out,
        "Score: {:.0} ({}), post-threshold slope {:.2}, speed tax {:.2}",
        record.resilience_score,
        record.resilience_status.as_str(),
        record.post_threshold_slope,
        record.speed_tax
    )?;
    writeln!(out)?;

    writeln!(out, "TRAINING ZONES")?;
    writeln!(out, "{}", zone_table(&record.training_zones))?;
    writeln!(out)?;

    if !record.race_projections.is_empty() {
        writeln!(out, "RACE PROJECTIONS (level: {})", record.athlete_level)?;
        writeln!(out, "{}", race_table(&record.race_projections, &record.level_projections))?;
        writeln!(out)?;
    }

    writeln!(out, "BENCHMARKS")?;
    writeln!(out, "{}", benchmark_table(&record.benchmarks))
}

/// Report of a three-stage hybrid analysis
pub fn write_hybrid_report<W: Write>(
    out: &mut W,
    metrics: &HybridMetrics,
    generated_at: DateTime<Utc>,
) -> io::Result<()> {
    let t = &metrics.threshold;
    write_header(out, "HYBRID THREE-STAGE TEST", generated_at)?;

    writeln!(
        out,
        "Threshold: {:.2} km/h ({} min/km) @ {:.0} bpm, target {:.2} mmol/L",
        t.threshold_speed,
        format_pace(t.threshold_speed),
        metrics.threshold_heart_rate,
        t.target_lactate
    )?;
    if let Some(dmax) = t.dmax_speed {
        writeln!(out, "Dmax cross-check: {:.2} km/h", dmax)?;
    }
    if t.fallback_applied {
        writeln!(out, "Note: no parabola root in range, linear fallback used")?;
    }
    writeln!(out, "Type: {} (VLaMax score {:.2})", metrics.metabolic_type, metrics.vla_max_score)?;
    writeln!(out, "VO2max: {:.1} ml/kg/min", metrics.vo2max)?;
    writeln!(
        out,
        "Resilience: {:.0} ({})",
        metrics.resilience_score,
        metrics.resilience_status.as_str()
    )?;
    writeln!(out)?;

    if !metrics.race_projections.is_empty() {
        writeln!(out, "RACE PROJECTIONS (level: {})", metrics.athlete_level)?;
        writeln!(out, "{}", race_table(&metrics.race_projections, &metrics.level_projections))?;
    }
    Ok(())
}

/// Report of an acid-bath test
pub fn write_acid_bath_report<W: Write>(
    out: &mut W,
    result: &AcidBathResult,
    generated_at: DateTime<Utc>,
) -> io::Result<()> {
    write_header(out, "ACID BATH", generated_at)?;
    writeln!(out, "Power index: {:.2} W/kg", result.power_index)?;
    writeln!(out, "Glycolytic index: {:.2}", result.glyco_index)?;
    writeln!(out, "Flush rate: {:.1}%", result.flush_rate)?;
    writeln!(
        out,
        "Run pace: {:.2} m/s -> {:.2} m/s ({:.2} min/km)",
        result.base_pace_mps, result.adjusted_pace_mps, result.adjusted_pace_min_per_km
    )?;
    for point in &result.chart {
        writeln!(out, "  {:<10} {:.2} mmol/L", point.label, point.lactate)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::ZoneName;

    #[test]
    fn test_format_pace() {
        assert_eq!(format_pace(12.0), "5:00");
        assert_eq!(format_pace(15.0), "4:00");
        assert_eq!(format_pace(13.5), "4:27");
        assert_eq!(format_pace(0.05), "-:--");
        assert_eq!(format_pace(f64::NAN), "-:--");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(1234.4), "20:34");
        assert_eq!(format_duration(3725.0), "1:02:05");
        assert_eq!(format_duration(-1.0), "-:--");
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(5000.0), "5 km");
        assert_eq!(format_distance(21097.5), "Half marathon");
        assert_eq!(format_distance(42195.0), "Marathon");
    }

    #[test]
    fn test_race_table_shows_level_model() {
        let riegel = vec![
            RaceProjection {
                distance_m: 5000.0,
                time_s: 1200.0,
                pace_min_per_km: 4.0,
                exponent: Some(1.08),
            },
            RaceProjection {
                distance_m: 10000.0,
                time_s: 2500.0,
                pace_min_per_km: 4.1667,
                exponent: Some(1.08),
            },
        ];
        let level = vec![RaceProjection {
            distance_m: 5000.0,
            time_s: 1150.0,
            pace_min_per_km: 3.8333,
            exponent: None,
        }];
        let table = race_table(&riegel, &level);
        assert!(table.contains("Level model"));
        assert!(table.contains("19:10"));
        assert!(table.contains("41:40"));
        assert!(table.contains(" - "));
    }

    #[test]
    fn test_zone_table_open_top_zone() {
        let zones = vec![TrainingZone {
            name: ZoneName::Hit,
            speed_min: 14.5,
            speed_max: None,
            heart_rate_min: 172.0,
            heart_rate_max: None,
        }];
        let table = zone_table(&zones);
        assert!(table.contains("HIT"));
        assert!(table.contains("> 14.5"));
    }
}
