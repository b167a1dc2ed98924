use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::SessionEntry;

/// One tab-separated log line for an entry, without a trailing newline.
///
/// Fields: `#id`, identifier or `unknown`, `D:`, `Y:`, `B:`, `Coklu:`,
/// `Net:` (two decimals), `Supheli:0|1`, then `question:label` pairs
/// separated by spaces.
pub fn format_log_line(entry: &SessionEntry) -> String {
    let answers: Vec<String> = entry
        .readings
        .iter()
        .map(|r| format!("{}:{}", r.question_number, r.marked_label))
        .collect();
    format!(
        "#{}\t{}\tD:{}\tY:{}\tB:{}\tCoklu:{}\tNet:{:.2}\tSupheli:{}\t{}",
        entry.id,
        entry.student_id.as_deref().unwrap_or("unknown"),
        entry.correct_count,
        entry.wrong_count,
        entry.blank_count,
        entry.multi_count,
        entry.net_score,
        u8::from(entry.suspicious),
        answers.join(" ")
    )
}

/// Append-only session log file.
#[derive(Debug)]
pub struct SessionLog {
    path: PathBuf,
    file: File,
}

impl SessionLog {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one line for `entry`.
    pub fn append(&mut self, entry: &SessionEntry) -> io::Result<()> {
        writeln!(self.file, "{}", format_log_line(entry))?;
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{MarkState, QuestionReading, QuestionStatus};

    fn reading(q: u32, label: &str, status: QuestionStatus, state: MarkState) -> QuestionReading {
        QuestionReading {
            question_number: q,
            marked_label: label.to_string(),
            status,
            state,
            max_score: 0.0,
        }
    }

    fn entry(student_id: Option<&str>) -> SessionEntry {
        SessionEntry {
            id: 3,
            student_id: student_id.map(str::to_owned),
            correct_count: 2,
            wrong_count: 1,
            blank_count: 1,
            multi_count: 1,
            net_score: 1.75,
            readings: vec![
                reading(1, "A", QuestionStatus::Correct, MarkState::Single),
                reading(2, "-", QuestionStatus::Blank, MarkState::Blank),
                reading(3, "B*", QuestionStatus::Wrong, MarkState::Multi),
            ],
            suspicious: true,
            suspicious_reasons: vec!["multiple marks on question 3".to_string()],
        }
    }

    #[test]
    fn log_line_fields() {
        assert_eq!(
            format_log_line(&entry(Some("407"))),
            "#3\t407\tD:2\tY:1\tB:1\tCoklu:1\tNet:1.75\tSupheli:1\t1:A 2:- 3:B*"
        );
        let mut e = entry(None);
        e.suspicious = false;
        e.net_score = 2.0;
        assert!(format_log_line(&e).starts_with("#3\tunknown\t"));
        assert!(format_log_line(&e).contains("\tNet:2.00\tSupheli:0\t"));
    }

    #[test]
    fn log_appends_lines() {
        let path = std::env::temp_dir().join(format!(
            "bubblegrid-session-{}.log",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        {
            let mut log = SessionLog::open(&path).expect("open");
            log.append(&entry(Some("1"))).expect("append");
        }
        let mut log = SessionLog::open(&path).expect("reopen");
        log.append(&entry(Some("2"))).expect("append");

        let text = std::fs::read_to_string(log.path()).expect("read");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("#3\t1\t"));
        assert!(lines[1].starts_with("#3\t2\t"));
        let _ = std::fs::remove_file(&path);
    }
}
