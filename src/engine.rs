use crate::actions::{self, Outcome, TransferMode};
use crate::classifier;
use crate::config::Config;
use crate::decision::{GroupResolution, PhaseState, Prompter, Resolution, StickyChoice};
use crate::error::{Error, Result};
use crate::model::{FileGroup, Finding};
use crate::progress::ProgressReporter;
use crate::scanner::Scanner;
use chrono::{DateTime, Local};
use colored::*;
use std::fmt;
use std::fs;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

const SEPARATOR_WIDTH: usize = 25;

/// The phases a run can perform, in the order they always execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    Empty,
    Temporary,
    ProblematicNames,
    UnusualPermissions,
    RepeatedNames,
    DuplicateContent,
    MoveToMain,
    CopyToMain,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::Empty,
        Operation::Temporary,
        Operation::ProblematicNames,
        Operation::UnusualPermissions,
        Operation::RepeatedNames,
        Operation::DuplicateContent,
        Operation::MoveToMain,
        Operation::CopyToMain,
    ];
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = match self {
            Self::Empty => "empty files",
            Self::Temporary => "temporary files",
            Self::ProblematicNames => "problematic file names",
            Self::UnusualPermissions => "unusual permissions",
            Self::RepeatedNames => "repeated file names",
            Self::DuplicateContent => "duplicate content",
            Self::MoveToMain => "move files to main directory",
            Self::CopyToMain => "copy files to main directory",
        };
        f.write_str(title)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseStats {
    pub findings: usize,
    /// Files deleted, renamed, changed or transferred.
    pub applied: usize,
    pub declined: usize,
}

#[derive(Debug)]
pub struct PhaseReport {
    pub operation: Operation,
    pub result: Result<PhaseStats>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub phases: Vec<PhaseReport>,
}

impl RunSummary {
    pub fn aborted(&self) -> impl Iterator<Item = &PhaseReport> {
        self.phases.iter().filter(|phase| phase.result.is_err())
    }

    pub fn is_success(&self) -> bool {
        self.aborted().next().is_none()
    }
}

pub struct Engine {
    config: Config,
    main_dir: PathBuf,
    directories: Vec<PathBuf>,
}

impl Engine {
    pub fn new(config: Config, main_dir: PathBuf, directories: Vec<PathBuf>) -> Self {
        Self {
            config,
            main_dir,
            directories,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn print_header<R: BufRead, W: Write>(&self, prompter: &mut Prompter<R, W>) -> Result<()> {
        prompter.say(format!("Main directory set to: {}", self.main_dir.display()))?;
        let directories: Vec<String> = self
            .directories
            .iter()
            .map(|dir| dir.display().to_string())
            .collect();
        prompter.say(format!(
            "Additional directories are set to: {}",
            directories.join(", ")
        ))?;
        prompter.say("=".repeat(SEPARATOR_WIDTH))
    }

    /// Run the selected operations in their fixed order.
    ///
    /// A failing phase is reported and the run moves on to the next one;
    /// changes already made stay in place. Only a failure to write to the
    /// operator is returned as an error.
    pub fn run<R: BufRead, W: Write>(
        &self,
        operations: &[Operation],
        prompter: &mut Prompter<R, W>,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for operation in Operation::ALL.into_iter().filter(|op| operations.contains(op)) {
            prompter.say(format!("Checking {}...", operation).bold())?;
            let start = Instant::now();
            let result = self.run_phase(operation, prompter, reporter);

            match &result {
                Ok(stats) => info!(
                    "Phase '{}' done in {:.2}s: {} found, {} applied, {} declined",
                    operation,
                    start.elapsed().as_secs_f64(),
                    stats.findings,
                    stats.applied,
                    stats.declined,
                ),
                Err(err) => {
                    warn!("Phase '{}' aborted: {}", operation, err);
                    prompter.say(format!("Error: {}. Stopping {} phase.", err, operation).red())?;
                }
            }
            prompter.say("=".repeat(SEPARATOR_WIDTH))?;

            summary.phases.push(PhaseReport { operation, result });
        }

        Ok(summary)
    }

    fn run_phase<R: BufRead, W: Write>(
        &self,
        operation: Operation,
        prompter: &mut Prompter<R, W>,
        reporter: &dyn ProgressReporter,
    ) -> Result<PhaseStats> {
        match operation {
            Operation::Empty => {
                let findings = classifier::empty_files(self.scanner()?.files())?;
                self.resolve_deletions(findings, "Empty file", prompter)
            }
            Operation::Temporary => {
                let findings = classifier::temporary_files(self.scanner()?.files(), &self.config)?;
                self.resolve_deletions(findings, "Temporary file", prompter)
            }
            Operation::ProblematicNames => {
                let findings = classifier::problematic_names(self.scanner()?.files(), &self.config)?;
                self.resolve_renames(findings, prompter)
            }
            Operation::UnusualPermissions => {
                let findings =
                    classifier::unusual_permissions(self.scanner()?.files(), &self.config)?;
                self.resolve_permissions(findings, prompter)
            }
            Operation::RepeatedNames => {
                let findings = classifier::group_by_name(self.scanner()?.files(), reporter)?;
                self.resolve_groups(findings, prompter)
            }
            Operation::DuplicateContent => {
                let findings = classifier::group_by_content(self.scanner()?.files(), reporter)?;
                self.resolve_groups(findings, prompter)
            }
            Operation::MoveToMain => self.transfer_all(TransferMode::Move, prompter),
            Operation::CopyToMain => self.transfer_all(TransferMode::Copy, prompter),
        }
    }

    /// Scanning starts from scratch for every phase since earlier phases may
    /// have removed or renamed files.
    fn scanner(&self) -> Result<Scanner> {
        Scanner::new(&self.main_dir, &self.directories)
    }

    fn resolve_deletions<R: BufRead, W: Write>(
        &self,
        findings: Vec<Finding>,
        label: &str,
        prompter: &mut Prompter<R, W>,
    ) -> Result<PhaseStats> {
        let mut stats = start_stats(&findings);
        let mut phase = PhaseState::new();

        for finding in &findings {
            let (Finding::Empty(record) | Finding::Temporary(record)) = finding else {
                continue;
            };
            let question = format!(
                "{} was found at: {}. Do you want to remove it?",
                label,
                record.path().display()
            );
            match phase.resolve(prompter, &question)? {
                Resolution::Apply { auto } => {
                    let outcome = actions::delete_file(record.path())?;
                    report(prompter, &outcome, auto, &mut stats)?;
                }
                Resolution::Decline => stats.declined += 1,
                Resolution::Stop => {
                    prompter.say("Skipping all deletions")?;
                    break;
                }
            }
        }
        Ok(stats)
    }

    fn resolve_renames<R: BufRead, W: Write>(
        &self,
        findings: Vec<Finding>,
        prompter: &mut Prompter<R, W>,
    ) -> Result<PhaseStats> {
        let mut stats = start_stats(&findings);
        let mut phase = PhaseState::new();

        for finding in &findings {
            let Finding::ProblematicName(record) = finding else {
                continue;
            };
            let Some(plan) = actions::plan_rename(
                record,
                self.config.problematic_characters(),
                self.config.replacement_character(),
            ) else {
                debug!("No usable new name for {}", record.path().display());
                prompter.say(format!(
                    "Cannot suggest a new name for {}, leaving it as is",
                    record.path().display()
                ))?;
                continue;
            };

            let question = format!(
                "Problematic file found at: {}. Suggested new name is: {}. Do you want to change it?",
                record.path().display(),
                plan.new_name()
            );
            match phase.resolve(prompter, &question)? {
                Resolution::Apply { auto } => {
                    let outcome = actions::apply_rename(&plan)?;
                    report(prompter, &outcome, auto, &mut stats)?;
                }
                Resolution::Decline => stats.declined += 1,
                Resolution::Stop => {
                    prompter.say("Skipping all renaming")?;
                    break;
                }
            }
        }
        Ok(stats)
    }

    fn resolve_permissions<R: BufRead, W: Write>(
        &self,
        findings: Vec<Finding>,
        prompter: &mut Prompter<R, W>,
    ) -> Result<PhaseStats> {
        let mut stats = start_stats(&findings);
        let mut phase = PhaseState::new();
        let suggested = self.config.suggested_file_permissions();

        for finding in &findings {
            let Finding::UnusualPermissions(record) = finding else {
                continue;
            };
            let question = format!(
                "File {} has unusual permissions: {}. Suggested permissions are {}. Do you want to change them?",
                record.path().display(),
                record.permissions(),
                suggested
            );
            match phase.resolve(prompter, &question)? {
                Resolution::Apply { auto } => {
                    let outcome = actions::change_permissions(record.path(), suggested)?;
                    report(prompter, &outcome, auto, &mut stats)?;
                }
                Resolution::Decline => stats.declined += 1,
                Resolution::Stop => {
                    prompter.say("Skipping all permission changes")?;
                    break;
                }
            }
        }
        Ok(stats)
    }

    fn resolve_groups<R: BufRead, W: Write>(
        &self,
        findings: Vec<Finding>,
        prompter: &mut Prompter<R, W>,
    ) -> Result<PhaseStats> {
        let mut stats = start_stats(&findings);
        let mut phase = PhaseState::new();

        for finding in &findings {
            if phase.sticky() == StickyChoice::AlwaysNo {
                break;
            }
            let (group, description) = match finding {
                Finding::DuplicateGroup { digest, group } => {
                    prompter.say(format!(
                        "Files with duplicate content (hash: {}), from oldest to latest:",
                        digest.to_hex()
                    ))?;
                    (group, format!("with hash {}", digest.to_hex()))
                }
                Finding::RepeatedNameGroup { name, group } => {
                    prompter.say(format!(
                        "Repeated files with name (from latest to oldest): {}",
                        name
                    ))?;
                    (group, format!("with name {}", name))
                }
                _ => continue,
            };
            let tag = match finding {
                Finding::DuplicateGroup { .. } => "(OLDEST)",
                _ => "(LATEST)",
            };
            list_members(prompter, group, tag)?;

            let before = phase.sticky();
            let resolution = phase.resolve_group(prompter, group.len())?;
            if before != StickyChoice::AlwaysYes
                && phase.sticky() == StickyChoice::AlwaysYes
                && matches!(finding, Finding::RepeatedNameGroup { .. })
            {
                prompter.say(
                    "Warning: the remaining groups only share a name, their contents may differ. \
                     The latest file of each will be kept and the rest deleted without asking."
                        .yellow(),
                )?;
            }

            match resolution {
                GroupResolution::Keep { position, auto } => {
                    for path in actions::members_to_delete(group, Some(position)) {
                        let outcome = actions::delete_file(path)?;
                        report(prompter, &outcome, auto, &mut stats)?;
                    }
                }
                GroupResolution::KeepAll => {
                    stats.declined += 1;
                    prompter.say(format!("Keeping all files {}", description))?;
                }
                GroupResolution::Stop => {
                    stats.declined += 1;
                    prompter.say("Keeping all remaining files")?;
                    break;
                }
            }
        }
        Ok(stats)
    }

    fn transfer_all<R: BufRead, W: Write>(
        &self,
        mode: TransferMode,
        prompter: &mut Prompter<R, W>,
    ) -> Result<PhaseStats> {
        fs::create_dir_all(&self.main_dir)
            .map_err(|e| Error::action("create directory", &self.main_dir, e))?;

        let mut stats = PhaseStats::default();
        for directory in &self.directories {
            let transfers = actions::plan_transfers(&self.main_dir, directory)?;
            stats.findings += transfers.len();
            for item in &transfers {
                let outcome = actions::transfer(item, mode)?;
                report(prompter, &outcome, false, &mut stats)?;
            }
        }
        Ok(stats)
    }
}

fn start_stats(findings: &[Finding]) -> PhaseStats {
    for finding in findings {
        debug!("Found {:?}", finding.paths());
    }
    PhaseStats {
        findings: findings.len(),
        ..PhaseStats::default()
    }
}

fn list_members<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    group: &FileGroup,
    first_tag: &str,
) -> Result<()> {
    for (i, member) in group.members().iter().enumerate() {
        let modified: DateTime<Local> = member.modified().into();
        let tag = if i == 0 {
            first_tag.yellow().to_string()
        } else {
            String::new()
        };
        prompter.say(format!(
            "{}. {} ({} bytes, modified {}) {}",
            i + 1,
            member.path().display(),
            member.size(),
            modified.format("%Y-%m-%d %H:%M:%S"),
            tag
        ))?;
    }
    Ok(())
}

fn report<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    outcome: &Outcome,
    auto: bool,
    stats: &mut PhaseStats,
) -> Result<()> {
    if outcome.is_applied() {
        stats.applied += 1;
    } else {
        stats.declined += 1;
    }
    if auto {
        prompter.say(format!("{} {}", outcome, "(always yes mode)".dimmed()))
    } else {
        prompter.say(outcome)
    }
}
