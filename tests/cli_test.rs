mod common;

use anyhow::Result;
use common::{SAMPLE_WORDS, TestEnvironment};

#[test]
fn text_export_prints_one_line_per_caption() -> Result<()> {
    let env = TestEnvironment::new()?;
    let words = env.write_file("words.json", SAMPLE_WORDS)?;

    let output = env.run_subburn(&["text", words.to_str().unwrap()])?;
    assert_eq!(output.exit_code, 0, "text failed: {}", output.stderr);
    assert_eq!(output.stdout, "[00:00] the quick\n[00:01] brown\n");

    // First run writes the default config
    assert!(env.config_path().exists());
    Ok(())
}

#[test]
fn text_export_of_empty_list_prints_placeholder() -> Result<()> {
    let env = TestEnvironment::new()?;
    let words = env.write_file(
        "words.json",
        r#"{"words": [{"text": " ", "start": 0, "end": 1}]}"#,
    )?;

    let output = env.run_subburn(&["text", words.to_str().unwrap()])?;
    assert_eq!(output.exit_code, 0, "text failed: {}", output.stderr);
    assert_eq!(output.stdout, "# No subtitles available\n");
    Ok(())
}

#[test]
fn ass_export_is_sized_for_the_frame() -> Result<()> {
    let env = TestEnvironment::new()?;
    let words = env.write_file("words.json", SAMPLE_WORDS)?;
    let out = env.path().join("subs").join("captions.ass");

    let output = env.run_subburn(&[
        "ass",
        words.to_str().unwrap(),
        "--width",
        "3840",
        "--height",
        "2160",
        "-o",
        out.to_str().unwrap(),
    ])?;
    assert_eq!(output.exit_code, 0, "ass failed: {}", output.stderr);

    let ass = std::fs::read_to_string(&out)?;
    assert!(ass.contains("PlayResX: 1920"));
    assert!(ass.contains("PlayResY: 1080"));
    assert!(ass.contains("Style: Default,Montserrat,56,"));
    assert_eq!(ass.matches("Dialogue: ").count(), 2);
    assert!(ass.contains("{\\k6}"));
    Ok(())
}

#[test]
fn config_overrides_segmentation() -> Result<()> {
    let env = TestEnvironment::new()?;
    std::fs::write(env.config_path(), "[segment]\nmax_chars = 4\n")?;
    let words = env.write_file("words.json", SAMPLE_WORDS)?;

    let output = env.run_subburn(&["text", words.to_str().unwrap()])?;
    assert_eq!(output.exit_code, 0, "text failed: {}", output.stderr);
    assert_eq!(output.stdout, "[00:00] the\n[00:00] quick\n[00:01] brown\n");
    Ok(())
}

#[test]
fn json_mode_reports_errors_as_events() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = env.run_subburn(&["--json", "text", "missing.json"])?;
    assert_eq!(output.exit_code, 1);
    let event: serde_json::Value = serde_json::from_str(output.stderr.trim())?;
    assert_eq!(event["level"], "error");
    assert_eq!(event["code"], "subburn.error");
    assert!(event["message"].as_str().unwrap().contains("missing.json"));
    Ok(())
}

#[test]
fn process_rejects_missing_video() -> Result<()> {
    let env = TestEnvironment::new()?;
    let words = env.write_file("words.json", SAMPLE_WORDS)?;

    // Pointing the tools at existing files keeps this independent of a local ffmpeg install
    let fake_tool = env.write_file("fake-ffmpeg", "")?;
    std::fs::write(
        env.config_path(),
        format!(
            "[tools]\nffmpeg = \"{0}\"\nffprobe = \"{0}\"\n",
            fake_tool.display()
        ),
    )?;

    let output = env.run_subburn(&[
        "process",
        "does-not-exist.mp4",
        "--words",
        words.to_str().unwrap(),
        "--dry-run",
    ])?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("uploaded"), "{}", output.stderr);
    assert!(output.stderr.contains("does not exist"), "{}", output.stderr);
    Ok(())
}
