//! The `markbook init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("markbook.toml").exists() {
        println!("markbook.toml already exists, skipping.");
    } else {
        std::fs::write("markbook.toml", SAMPLE_CONFIG)?;
        println!("Created markbook.toml");
    }

    std::fs::create_dir_all("exams")?;
    let sample_path = std::path::Path::new("exams/sample.json");
    if sample_path.exists() {
        println!("exams/sample.json already exists, skipping.");
    } else {
        std::fs::write(sample_path, SAMPLE_EXAM)?;
        println!("Created exams/sample.json");
    }

    println!("\nNext steps:");
    println!("  1. Run: markbook validate --input exams/sample.json");
    println!("  2. Run: markbook analyze --input exams/sample.json");
    println!("  3. Run: markbook compare --input exams/sample.json --student st-2");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# markbook configuration

# Where `markbook analyze --save` writes reports.
output_dir = "./markbook-reports"

# text, json or markdown
default_format = "text"

# Restrict analysis to one class by default.
# class_filter = "10A"

# Percentage points a student must be above or below the cohort on a
# question for it to be listed as a strength or weakness.
comparison_threshold = 10.0

pretty_json = true
"#;

const SAMPLE_EXAM: &str = r#"{
  "dataType": "exam",
  "version": 2,
  "mode": "analysis",
  "exam": {
    "id": "sample-exam",
    "name": "Sample Exam",
    "date": "2024-01-01",
    "cohort": "Year 10",
    "syllabusId": "",
    "totalMarks": 6,
    "questions": [
      {"id": "sq1", "number": "1", "maxMarks": 1, "type": "mcq", "correctAnswer": "C",
       "cognitiveVerbs": ["identify"], "modules": ["Module 1"]},
      {"id": "sq2", "number": "2", "maxMarks": 5, "type": "short", "subQuestions": [
        {"id": "sq2a", "number": "a", "maxMarks": 2, "type": "short",
         "cognitiveVerbs": ["describe"], "modules": ["Module 1"]},
        {"id": "sq2b", "number": "b", "maxMarks": 3, "type": "extended",
         "cognitiveVerbs": ["explain"], "modules": ["Module 2"]}
      ]}
    ]
  },
  "students": [
    {"id": "st-1", "name": "First Student", "className": "10A"},
    {"id": "st-2", "name": "Second Student", "className": "10A"},
    {"id": "st-3", "name": "Third Student", "className": "10B"}
  ],
  "results": [
    {"id": "sr-1", "examId": "sample-exam", "studentId": "st-1",
     "questionScores": {"sq1": 1, "sq2a": 2, "sq2b": 3}, "questionResponses": {"sq1": "C"}},
    {"id": "sr-2", "examId": "sample-exam", "studentId": "st-2",
     "questionScores": {"sq1": 0, "sq2a": 1, "sq2b": 1}, "questionResponses": {"sq1": "A"}},
    {"id": "sr-3", "examId": "sample-exam", "studentId": "st-3",
     "questionScores": {"sq1": 1, "sq2a": 2, "sq2b": 1}, "questionResponses": {"sq1": "C"}}
  ]
}
"#;
