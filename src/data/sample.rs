//! Synthetic multi-country dataset.
//!
//! Produces records shaped like the public dataset (cumulative + daily counts,
//! hospital load, testing, vaccination roll-out) so every view works offline.
//! Output is fully determined by the config.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{COMPARISON_START, DailyRecord};

/// Day (relative to `start`) on which vaccination begins.
const VACCINATION_START_DAY: usize = 320;
/// Days a case takes, on average, to show up as a death.
const DEATH_LAG_DAYS: usize = 14;
/// Days a case stays in hospital.
const HOSPITAL_STAY_DAYS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub countries: Vec<String>,
    pub start: NaiveDate,
    pub days: usize,
    pub seed: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            countries: vec![
                "Freedonia".to_string(),
                "Sylvania".to_string(),
                "Grand Fenwick".to_string(),
            ],
            start: COMPARISON_START,
            days: 420,
            seed: 42,
        }
    }
}

/// A Gaussian-shaped infection wave.
#[derive(Debug, Clone, Copy)]
struct Wave {
    peak_day: f64,
    width: f64,
    height: f64,
}

/// Generate records for every configured country, grouped by country and ordered by date.
pub fn generate_sample(config: &SampleConfig) -> Vec<DailyRecord> {
    let mut out = Vec::with_capacity(config.countries.len() * config.days);
    for country in &config.countries {
        out.extend(generate_country(country, config));
    }
    out
}

fn generate_country(country: &str, config: &SampleConfig) -> Vec<DailyRecord> {
    let mut rng = StdRng::seed_from_u64(country_seed(country, config.seed));
    let Ok(noise) = Normal::new(0.0, 0.08) else {
        return Vec::new();
    };

    let scale = rng.gen_range(0.5..3.0);
    let waves: Vec<Wave> = (0..3)
        .map(|k| Wave {
            peak_day: 60.0 + 130.0 * k as f64 + rng.gen_range(-20.0..20.0),
            width: rng.gen_range(18.0..35.0),
            height: scale * rng.gen_range(2_000.0..9_000.0),
        })
        .collect();
    let fatality = rng.gen_range(0.008..0.025);
    let hosp_share = rng.gen_range(0.03..0.08);
    let vaccination_rate = rng.gen_range(0.002..0.006) * scale * 1_000_000.0;
    let population = scale * 5_000_000.0;

    let mut new_cases_hist: Vec<f64> = Vec::with_capacity(config.days);
    let mut total_cases = 0.0;
    let mut total_deaths = 0.0;
    let mut total_tests = 5_000.0 * scale;
    let mut people_vaccinated = 0.0;
    let mut people_fully = 0.0;

    let mut records = Vec::with_capacity(config.days);
    for day in 0..config.days {
        let t = day as f64;
        let incidence: f64 = 5.0
            + waves
                .iter()
                .map(|w| w.height * (-((t - w.peak_day) / w.width).powi(2)).exp())
                .sum::<f64>();

        let new_cases = (incidence * (1.0 + noise.sample(&mut rng))).round().max(1.0);
        new_cases_hist.push(new_cases);
        total_cases += new_cases;

        let lagged = day
            .checked_sub(DEATH_LAG_DAYS)
            .map(|i| new_cases_hist[i])
            .unwrap_or(0.0);
        // Treatment improves over time.
        let cfr = fatality * (1.0 - 0.5 * (t / config.days as f64));
        let new_deaths = (lagged * cfr * (1.0 + noise.sample(&mut rng))).round().max(0.0);
        total_deaths += new_deaths;

        let recent: f64 = new_cases_hist[day.saturating_sub(HOSPITAL_STAY_DAYS - 1)..=day].iter().sum();
        let hosp_patients = (recent * hosp_share).round();
        let icu_patients = (hosp_patients * 0.22).round();

        // Positivity climbs with incidence; testing capacity ramps up over time.
        let positivity = (0.02 + 0.25 * incidence / (incidence + 4_000.0 * scale)).clamp(0.01, 0.5);
        let capacity = 1.0 + t / 120.0;
        let new_tests = (new_cases / positivity * capacity).round();
        total_tests += new_tests;

        let date = config.start + Duration::days(day as i64);
        let mut r = DailyRecord::empty(country, date);
        r.new_cases = Some(new_cases);
        r.total_cases = Some(total_cases);
        r.new_deaths = Some(new_deaths);
        r.total_deaths = Some(total_deaths);
        r.hosp_patients = Some(hosp_patients);
        r.icu_patients = Some(icu_patients);
        r.new_tests = Some(new_tests);
        r.total_tests = Some(total_tests);

        if day >= VACCINATION_START_DAY {
            let first = (vaccination_rate * (1.0 + noise.sample(&mut rng)))
                .round()
                .min(population - people_vaccinated)
                .max(0.0);
            people_vaccinated += first;
            // Second doses follow the first ones three weeks later.
            let second = if day >= VACCINATION_START_DAY + 21 {
                (first * 0.9).min(people_vaccinated - people_fully).max(0.0)
            } else {
                0.0
            };
            people_fully += second;

            r.people_vaccinated = Some(people_vaccinated);
            r.people_fully_vaccinated = Some(people_fully);
            r.total_vaccinations = Some(people_vaccinated + people_fully);
            r.new_vaccinations = Some(first + second);
        }

        records.push(r);
    }

    records
}

fn country_seed(country: &str, seed: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    country.hash(&mut hasher);
    seed.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_is_deterministic() {
        let config = SampleConfig::default();
        assert_eq!(generate_sample(&config), generate_sample(&config));
    }

    #[test]
    fn cumulative_columns_never_decrease() {
        let config = SampleConfig::default();
        let records = generate_sample(&config);
        assert_eq!(records.len(), config.countries.len() * config.days);

        for country in &config.countries {
            let rows: Vec<&DailyRecord> = records.iter().filter(|r| &r.location == country).collect();
            for w in rows.windows(2) {
                assert!(w[0].date < w[1].date);
                assert!(w[1].total_cases >= w[0].total_cases);
                assert!(w[1].total_deaths >= w[0].total_deaths);
                assert!(w[1].total_tests >= w[0].total_tests);
            }
            assert!(rows[0].people_fully_vaccinated.is_none());
            assert!(rows.last().unwrap().people_fully_vaccinated.unwrap() > 0.0);
        }
    }
}
