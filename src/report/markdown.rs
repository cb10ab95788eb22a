use crate::error::ReportError;
use crate::model::{
    AuthoredIssue, Category, CoAuthoredPullRequest, Collaboration, CollaborationKind, Contribution,
    ContributionDataset, MergedPullRequest, PrState, QuarterKey, ReviewedPullRequest,
};
use markdown_builder::Markdown;
use markdown_table::{Heading, HeadingAlignment, MarkdownTable};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const EMPTY_SECTION: &str = "No contributions found for this section.";
const ALL_TIME_FILE: &str = "all-time.md";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub trait MarkdownReport {
    /// Writes the report files under `output_dir`, returning their paths.
    fn report_create(&self, output_dir: &Path) -> Result<Vec<PathBuf>, ReportError>;
}

impl MarkdownReport for ContributionDataset {
    fn report_create(&self, output_dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
        let quarters = self.group_by_quarter();
        let mut written = vec![];

        for (quarter, data) in &quarters {
            if data.is_empty() {
                continue;
            }
            let path = output_dir.join(quarter_file(quarter));
            write_report(&path, quarter_document(quarter, data)?)?;
            written.push(path);
        }

        let path = output_dir.join(ALL_TIME_FILE);
        write_report(&path, all_time_document(self, &quarters)?)?;
        written.push(path);

        tracing::info!(files = written.len(), dir = %output_dir.display(), "Reports written");
        Ok(written)
    }
}

/// `2024/Q2-2024.md`, relative to the output directory.
fn quarter_file(quarter: &QuarterKey) -> PathBuf {
    PathBuf::from(quarter.year.to_string()).join(format!("Q{}-{}.md", quarter.quarter, quarter.year))
}

fn write_report(path: &Path, content: String) -> Result<(), ReportError> {
    let io_error = |source: std::io::Error| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, content).map_err(io_error)
}

fn quarter_document(quarter: &QuarterKey, data: &ContributionDataset) -> Result<String, ReportError> {
    let mut doc = Markdown::new();
    doc.header1(&format!("Contributions - Q{} {}", quarter.quarter, quarter.year));
    doc.add_section(Category::PullRequests, rows(&data.pull_requests))?;
    doc.add_section(Category::Issues, rows(&data.issues))?;
    doc.add_section(Category::ReviewedPrs, rows(&data.reviewed_prs))?;
    doc.add_section(Category::CoAuthoredPrs, rows(&data.co_authored_prs))?;
    doc.add_section(Category::Collaborations, rows(&data.collaborations))?;
    Ok(doc.render())
}

fn all_time_document(
    dataset: &ContributionDataset,
    quarters: &BTreeMap<QuarterKey, ContributionDataset>,
) -> Result<String, ReportError> {
    let mut doc = Markdown::new();
    doc.header1("All-Time Contributions");
    doc.paragraph(format!(
        "{} contributions across {} quarters.",
        dataset.len(),
        quarters.len()
    ));

    doc.header2("Totals".to_string());
    let totals = Category::ALL
        .iter()
        .map(|category| vec![category.title().to_string(), dataset.count(*category).to_string()])
        .collect::<Vec<_>>();
    doc.add_table(vec![heading("Category"), centered("Count")], totals)?;

    doc.header2("By Quarter".to_string());
    if quarters.is_empty() {
        doc.paragraph(EMPTY_SECTION.to_string());
        return Ok(doc.render());
    }
    let counts = Category::ALL.iter().map(|c| centered(c.title())).collect::<Vec<_>>();
    let header = [vec![heading("Quarter")], counts, vec![centered("Total")]].concat();
    let by_quarter = quarters
        .iter()
        .rev()
        .map(|(quarter, data)| {
            let link = format!("[{quarter}]({})", quarter_file(quarter).display());
            let counts = Category::ALL.iter().map(|c| data.count(*c).to_string()).collect::<Vec<_>>();
            [vec![link], counts, vec![data.len().to_string()]].concat()
        })
        .collect::<Vec<_>>();
    doc.add_table(header, by_quarter)?;
    Ok(doc.render())
}

trait MarkdownExt {
    fn add_section(&mut self, category: Category, rows: Vec<Vec<String>>) -> Result<(), ReportError>;

    fn add_table(&mut self, header: Vec<Heading>, rows: Vec<Vec<String>>) -> Result<(), ReportError>;
}

impl MarkdownExt for Markdown {
    fn add_section(&mut self, category: Category, rows: Vec<Vec<String>>) -> Result<(), ReportError> {
        self.header2(category.title().to_string());
        if rows.is_empty() {
            self.paragraph(EMPTY_SECTION.to_string());
            return Ok(());
        }
        let header = vec![
            heading("Project Name"),
            heading("Link"),
            heading("Description"),
            heading("Date"),
            heading(details_heading(category)),
        ];
        self.add_table(header, rows)
    }

    fn add_table(&mut self, header: Vec<Heading>, rows: Vec<Vec<String>>) -> Result<(), ReportError> {
        let mut md_table = MarkdownTable::new(rows);
        md_table.with_headings(header);
        let table = md_table
            .as_markdown()
            .map_err(|e| ReportError::Table(format!("{e:?}")))?;
        self.paragraph(table);
        Ok(())
    }
}

fn heading(title: &str) -> Heading {
    Heading::new(title.to_string(), None)
}

fn centered(title: &str) -> Heading {
    Heading::new(title.to_string(), Some(HeadingAlignment::Center))
}

fn details_heading(category: Category) -> &'static str {
    match category {
        Category::PullRequests => "Review Period",
        Category::Issues => "Status",
        Category::ReviewedPrs => "First Review",
        Category::CoAuthoredPrs => "Commits",
        Category::Collaborations => "Kind",
    }
}

/// The variant-specific column of a report row.
trait ReportDetails {
    fn details(&self) -> String;
}

impl ReportDetails for MergedPullRequest {
    fn details(&self) -> String {
        format!("Merged after {}", days(self.review_period_days))
    }
}

impl ReportDetails for AuthoredIssue {
    fn details(&self) -> String {
        match self.closing_period_days {
            Some(period) => format!("Closed after {}", days(period)),
            None => "Open".to_string(),
        }
    }
}

impl ReportDetails for ReviewedPullRequest {
    fn details(&self) -> String {
        format!(
            "After {} ({})",
            days(self.my_first_review_period_days),
            state_label(self.state)
        )
    }
}

impl ReportDetails for CoAuthoredPullRequest {
    fn details(&self) -> String {
        let commits = if self.commit_count == 1 { "commit" } else { "commits" };
        format!("{} {commits} ({})", self.commit_count, state_label(self.state))
    }
}

impl ReportDetails for Collaboration {
    fn details(&self) -> String {
        match self.kind {
            CollaborationKind::PullRequest => "Pull request".to_string(),
            CollaborationKind::Issue => "Issue".to_string(),
        }
    }
}

fn rows<T: Contribution + ReportDetails>(items: &[T]) -> Vec<Vec<String>> {
    items
        .iter()
        .map(|item| {
            let info = item.info();
            vec![
                cell(&info.repo),
                format!("[{}]({})", cell(&info.title), info.url),
                cell(&info.description),
                info.date.format(DATE_FORMAT).to_string(),
                item.details(),
            ]
        })
        .collect()
}

fn state_label(state: PrState) -> &'static str {
    match state {
        PrState::Open => "open",
        PrState::Closed => "closed",
        PrState::Merged => "merged",
    }
}

fn days(count: i64) -> String {
    if count == 1 {
        "1 day".to_string()
    } else {
        format!("{count} days")
    }
}

/// Pipes would split the table cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemInfo;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn dataset() -> ContributionDataset {
        let mut dataset = ContributionDataset::default();
        dataset.push(MergedPullRequest::new(
            ItemInfo::new(
                "Fix | parser",
                "https://github.com/acme/lib/pull/1",
                "acme/lib",
                Some("Handles pipes"),
                at(2024, 4, 1),
                at(2024, 4, 1),
            ),
            at(2024, 4, 3),
        ));
        dataset.push(AuthoredIssue::new(
            ItemInfo::new(
                "Crash",
                "https://github.com/acme/lib/issues/2",
                "acme/lib",
                None,
                at(2023, 11, 1),
                at(2023, 11, 1),
            ),
            None,
        ));
        dataset
    }

    #[test]
    fn test_rows_escape_pipes_and_format_dates() {
        let data = dataset();
        let rows = rows(&data.pull_requests);
        assert_eq!(rows[0][0], "acme/lib");
        assert_eq!(rows[0][1], "[Fix \\| parser](https://github.com/acme/lib/pull/1)");
        assert_eq!(rows[0][3], "2024-04-03");
        assert_eq!(rows[0][4], "Merged after 2 days");
    }

    #[test]
    fn test_details() {
        let data = dataset();
        assert_eq!(data.issues[0].details(), "Open");
        assert_eq!(days(1), "1 day");
    }

    #[test]
    fn test_quarter_document_marks_empty_sections() {
        let data = dataset();
        let quarters = data.group_by_quarter();
        let q2 = QuarterKey { year: 2024, quarter: 2 };
        let doc = quarter_document(&q2, &quarters[&q2]).unwrap();
        assert!(doc.contains("Contributions - Q2 2024"));
        assert!(doc.contains("Merged Pull Requests"));
        assert!(doc.contains("acme/lib"));
        assert!(doc.contains(EMPTY_SECTION));
    }

    #[test]
    fn test_report_create_writes_quarters_and_all_time() {
        let dir = tempfile::tempdir().unwrap();
        let written = dataset().report_create(dir.path()).unwrap();

        assert_eq!(written.len(), 3);
        assert!(dir.path().join("2024").join("Q2-2024.md").is_file());
        assert!(dir.path().join("2023").join("Q4-2023.md").is_file());
        let all_time = fs::read_to_string(dir.path().join(ALL_TIME_FILE)).unwrap();
        assert!(all_time.contains("2 contributions across 2 quarters."));
        assert!(all_time.contains("[2024-Q2](2024/Q2-2024.md)"));
    }

    #[test]
    fn test_empty_dataset_writes_only_all_time() {
        let dir = tempfile::tempdir().unwrap();
        let written = ContributionDataset::default()
            .report_create(dir.path())
            .unwrap();
        assert_eq!(written, vec![dir.path().join(ALL_TIME_FILE)]);
    }
}
