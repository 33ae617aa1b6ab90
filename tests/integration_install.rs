//! End-to-end batch installation: real HTTP fetcher against a loopback
//! server, recorded process runs, no installed-program metadata.

mod common;

use autoinstaller::{
    Cancelled, DetectionError, DetectionRule, HttpFetcher, InstallOptions, InstallProgress,
    InstallResult, InstallStatus, InstallSummary, InstalledPrograms, Installer, LogLevel,
    PresenceDetector, Scope, SoftwareItem, View,
};
use common::{bypass_proxy, not_found_response, ok_response, serve, MemoryLogger, RecordingRunner};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

struct NoPrograms;

impl InstalledPrograms for NoPrograms {
    fn display_names(&self, _: Scope, _: View) -> Result<Vec<String>, DetectionError> {
        Ok(Vec::new())
    }
}

struct Setup {
    installer: Installer,
    runner: Arc<RecordingRunner>,
    logger: Arc<MemoryLogger>,
    dir: tempfile::TempDir,
}

fn setup(runner: RecordingRunner) -> Setup {
    bypass_proxy();
    let dir = tempfile::tempdir().unwrap();
    let options = InstallOptions {
        download_dir: dir.path().join("downloads"),
        archive_dir: dir.path().join("FFmpeg"),
        ..Default::default()
    };
    std::fs::create_dir_all(&options.download_dir).unwrap();

    let logger = Arc::new(MemoryLogger::default());
    let runner = Arc::new(runner);
    let fetcher = Arc::new(HttpFetcher::new(&options, logger.clone()).unwrap());
    let installer = Installer::with_components(
        options,
        logger.clone(),
        PresenceDetector::with_programs(Arc::new(NoPrograms)),
        fetcher,
        runner.clone(),
    );
    Setup {
        installer,
        runner,
        logger,
        dir,
    }
}

async fn install(
    installer: &Installer,
    items: &[SoftwareItem],
    cancel: &CancellationToken,
) -> (Result<Vec<InstallResult>, Cancelled>, Vec<InstallProgress>) {
    let ticks = Mutex::new(Vec::new());
    let result = installer
        .install(items, |p| ticks.lock().unwrap().push(p), |_, _, _| {}, cancel)
        .await;
    (result, ticks.into_inner().unwrap())
}

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn test_mixed_batch_isolates_failures() {
    let s = setup(RecordingRunner::failing("wsl", 1));
    let marker = s.dir.path().join("present.exe");
    std::fs::write(&marker, b"").unwrap();

    let addr = serve(vec![ok_response(b"MZ installer")]).await;
    let items = vec![
        SoftwareItem::download("Present", format!("http://{addr}/present.exe"), "/S")
            .with_detection(DetectionRule::file(&marker)),
        SoftwareItem::download("Fresh", format!("http://{addr}/fresh-setup.exe"), "/S /quiet")
            .with_admin(true),
        SoftwareItem::system_command("WSL", "wsl", "--install").with_admin(true),
    ];

    let (result, ticks) = install(&s.installer, &items, &CancellationToken::new()).await;
    let results = result.unwrap();

    let statuses: Vec<_> = results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![InstallStatus::AlreadyInstalled, InstallStatus::Success, InstallStatus::Failed]
    );
    assert!(results[2].message.contains('1'));

    let summary = InstallSummary::from_results(&results);
    assert_eq!((summary.succeeded, summary.failed, summary.skipped), (1, 1, 1));

    let programs = s.runner.programs();
    assert_eq!(programs.len(), 2);
    assert!(programs[0].ends_with("fresh-setup.exe"));
    assert_eq!(programs[1], "wsl");

    // Overall progress never goes backwards and ends at 100.
    assert!(ticks
        .windows(2)
        .all(|w| w[0].overall_percent <= w[1].overall_percent));
    assert_eq!(ticks.last().map(|t| t.overall_percent), Some(100.0));
    assert_eq!(ticks.iter().filter(|t| t.message == "Done").count(), 3);

    assert!(s.logger.contains(LogLevel::Error, "WSL"));
}

#[tokio::test]
async fn test_http_error_fails_item_and_continues() {
    let s = setup(RecordingRunner::default());
    let addr = serve(vec![not_found_response(), ok_response(b"ok")]).await;
    let items = vec![
        SoftwareItem::download("Gone", format!("http://{addr}/gone.exe"), ""),
        SoftwareItem::download("Next", format!("http://{addr}/next.exe"), ""),
    ];

    let (result, _) = install(&s.installer, &items, &CancellationToken::new()).await;
    let results = result.unwrap();

    assert_eq!(results[0].status, InstallStatus::Failed);
    assert!(results[0].message.starts_with("Network error"));
    assert_eq!(results[1].status, InstallStatus::Success);
}

#[tokio::test]
async fn test_zip_artifact_is_extracted_into_archive_dir() {
    let s = setup(RecordingRunner::default());
    let archive = zip_bytes(&[("bin/ffmpeg.exe", b"ffmpeg"), ("LICENSE", b"GPL")]);
    let addr = serve(vec![ok_response(&archive)]).await;

    let target = s.installer.options().archive_dir.clone();
    let items = vec![SoftwareItem::download(
        "FFmpeg",
        format!("http://{addr}/ffmpeg-release-essentials.zip"),
        "",
    )
    .with_detection(DetectionRule::file(target.join("bin").join("ffmpeg.exe")))];

    assert!(!s.installer.is_installed(&items[0]));
    let (result, _) = install(&s.installer, &items, &CancellationToken::new()).await;

    assert_eq!(result.unwrap()[0].status, InstallStatus::Success);
    assert_eq!(std::fs::read(target.join("bin/ffmpeg.exe")).unwrap(), b"ffmpeg");
    assert!(s.runner.programs().is_empty());
    assert!(s.installer.is_installed(&items[0]));
}

#[tokio::test]
async fn test_cancel_between_items_returns_partial_results() {
    let s = setup(RecordingRunner::default());
    let items = vec![
        SoftwareItem::system_command("First", "first-tool", ""),
        SoftwareItem::system_command("Second", "second-tool", ""),
        SoftwareItem::system_command("Third", "third-tool", ""),
    ];

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let result = s
        .installer
        .install(
            &items,
            |_| {},
            move |item, status, _| {
                if item.name == "First" && status == InstallStatus::Success {
                    trigger.cancel();
                }
            },
            &cancel,
        )
        .await;

    let cancelled = result.unwrap_err();
    assert_eq!(cancelled.completed.len(), 1);
    assert_eq!(cancelled.completed[0].status, InstallStatus::Success);
    assert_eq!(s.runner.programs(), vec!["first-tool".to_string()]);
    assert!(s.logger.contains(LogLevel::Warn, "cancelled"));
}

#[tokio::test]
async fn test_cancel_while_server_stalls_reports_cancelled() {
    let s = setup(RecordingRunner::default());
    // Accepts connections but never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let items = vec![SoftwareItem::download("Slow", format!("http://{addr}/slow.exe"), "")];

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let (result, _) = install(&s.installer, &items, &cancel).await;

    let cancelled = result.unwrap_err();
    assert!(cancelled.completed.is_empty());
    assert!(s.runner.programs().is_empty());
    assert!(!s.logger.contains(LogLevel::Error, "Slow"));
    assert!(s.logger.contains(LogLevel::Warn, "cancelled during Slow"));
    drop(listener);
}
