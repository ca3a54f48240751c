use std::path::Path;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ResumeError;
use crate::geo::Coordinate;
use crate::registry::{LocationRecord, RecordKind, RecordRef};

const BUNDLED_RESUME: &str = include_str!("../data/resume.toml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    No,
    Zh,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::No, Language::Zh];

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::No => "no",
            Language::Zh => "zh",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lang| lang.code() == code)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::No => "Norsk",
            Language::Zh => "中文",
        }
    }

    pub fn present(&self) -> &'static str {
        match self {
            Language::En => "Present",
            Language::No => "Nå",
            Language::Zh => "至今",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalizedString {
    #[serde(default)]
    pub en: String,
    #[serde(default)]
    pub no: String,
    #[serde(default)]
    pub zh: String,
}

impl LocalizedString {
    /// Falls back to English when a translation is missing.
    pub fn get(&self, lang: Language) -> &str {
        let text = match lang {
            Language::En => &self.en,
            Language::No => &self.no,
            Language::Zh => &self.zh,
        };
        if text.is_empty() {
            &self.en
        } else {
            text
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub company: String,
    pub role: LocalizedString,
    /// ISO date, `YYYY-MM-DD`.
    pub start_date: String,
    /// ISO date or the literal `Present`.
    pub end_date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub description: Option<LocalizedString>,
}

impl Job {
    pub fn coordinate(&self) -> Option<Coordinate> {
        valid_coordinate(self.lat, self.lng)
    }

    pub fn is_current(&self) -> bool {
        self.end_date.eq_ignore_ascii_case("present")
    }

    /// `2019 - Present`, localized.
    pub fn period_years(&self, lang: Language) -> String {
        let end = if self.is_current() {
            lang.present().to_string()
        } else {
            year_of(&self.end_date)
        };
        format!("{} - {}", year_of(&self.start_date), end)
    }

    /// `mar. 2019 — Present`, as shown in the experience list.
    pub fn period_months(&self, lang: Language) -> String {
        let end = if self.is_current() {
            lang.present().to_string()
        } else {
            format_month(&self.end_date)
        };
        format!("{} — {}", format_month(&self.start_date), end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub year: String,
    pub description: LocalizedString,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

impl Project {
    pub fn coordinate(&self) -> Option<Coordinate> {
        valid_coordinate(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub name: String,
    pub title: LocalizedString,
    pub location: String,
    pub email: String,
    pub linkedin: String,
    pub summary: LocalizedString,
}

impl Contact {
    /// `Oslo, Norway · kari@example.com`, skipping whichever part is empty.
    pub fn details_line(&self) -> String {
        [self.location.trim(), self.email.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" · ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeData {
    pub contact: Contact,
    pub skills: Vec<String>,
    pub languages: Vec<String>,
    pub employment_history: Vec<Job>,
    pub projects: Vec<Project>,
}

impl ResumeData {
    pub fn bundled() -> Result<Self, ResumeError> {
        Self::from_toml_str(BUNDLED_RESUME)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ResumeError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ResumeError> {
        let source = std::fs::read_to_string(path).map_err(|source| ResumeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn job(&self, index: usize) -> Option<&Job> {
        self.employment_history.get(index)
    }

    pub fn project(&self, index: usize) -> Option<&Project> {
        self.projects.get(index)
    }

    /// One record per job and project that carries a usable location.
    pub fn location_records(&self) -> Vec<LocationRecord> {
        let jobs = self
            .employment_history
            .iter()
            .enumerate()
            .filter_map(|(index, job)| match job.coordinate() {
                Some(coordinates) => Some(LocationRecord {
                    kind: RecordKind::Employment,
                    coordinates,
                    payload: RecordRef::Job(index),
                }),
                None => {
                    debug!("Job {} has no usable location", job.company);
                    None
                }
            });

        let projects = self
            .projects
            .iter()
            .enumerate()
            .filter_map(|(index, project)| {
                project.coordinate().map(|coordinates| LocationRecord {
                    kind: RecordKind::Project,
                    coordinates,
                    payload: RecordRef::Project(index),
                })
            });

        jobs.chain(projects).collect()
    }
}

fn valid_coordinate(lat: Option<f64>, lng: Option<f64>) -> Option<Coordinate> {
    let coordinate = Coordinate::new(lat?, lng?);
    coordinate.is_valid().then_some(coordinate)
}

fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()
}

fn year_of(date: &str) -> String {
    match parse_date(date) {
        Some(parsed) => parsed.year().to_string(),
        None => date.split('-').next().unwrap_or(date).to_string(),
    }
}

/// `2019-03-01` becomes `mar. 2019`; anything unparseable is returned as-is.
pub fn format_month(date: &str) -> String {
    match parse_date(date) {
        Some(parsed) => parsed.format("%b. %Y").to_string().to_lowercase(),
        None => date.to_string(),
    }
}
