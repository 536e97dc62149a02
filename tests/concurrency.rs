//! Concurrent facade calls: every outcome is a tagged value and no
//! call's bytes are misattributed to another.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;
use tokio::task::JoinSet;
use tokio_test::assert_ok;

use capfetch::config::Config;
use capfetch::CaptchaClient;

fn fixture_script(dir: &TempDir, name: &str, body: &str) -> Result<PathBuf> {
    let path = dir.path().join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

#[tokio::test]
async fn twenty_concurrent_calls_all_return_tagged_outcomes() -> Result<()> {
    let dir = TempDir::new()?;
    let script = fixture_script(&dir, "capgen", "printf 'abcdeGIF89aimagedata;'")?;
    let client = Arc::new(CaptchaClient::new(Config::new(&script)));

    let mut calls = JoinSet::new();
    for _ in 0..20 {
        let client = Arc::clone(&client);
        calls.spawn(async move { client.get().await });
    }

    let mut successes = 0;
    while let Some(joined) = calls.join_next().await {
        // join_next surfaces panics; a panic here means an uncontrolled
        // fault escaped the facade.
        let outcome = joined.expect("facade call panicked");
        let captcha = outcome?;
        assert_eq!(captcha.text, b"abcde");
        assert_eq!(&captcha.image[..6], b"GIF89a");
        successes += 1;
    }
    assert_eq!(successes, 20);
    Ok(())
}

#[tokio::test]
async fn concurrent_clients_never_bleed_bytes_across_calls() -> Result<()> {
    let dir = TempDir::new()?;
    // Two generators with distinct challenges and image payloads. Each
    // client must only ever see its own generator's stream.
    let alpha = fixture_script(&dir, "alpha", "printf 'aaaaaGIF89aALPHA;'")?;
    let bravo = fixture_script(&dir, "bravo", "printf 'bbbbbGIF89aBRAVO;'")?;

    let client_a = Arc::new(CaptchaClient::new(Config::new(&alpha)));
    let client_b = Arc::new(CaptchaClient::new(Config::new(&bravo)));

    let mut calls = JoinSet::new();
    for i in 0..20 {
        let client = if i % 2 == 0 {
            Arc::clone(&client_a)
        } else {
            Arc::clone(&client_b)
        };
        calls.spawn(async move { (i, client.get().await) });
    }

    while let Some(joined) = calls.join_next().await {
        let (i, outcome) = joined.expect("facade call panicked");
        let captcha = outcome?;
        if i % 2 == 0 {
            assert_eq!(captcha.text, b"aaaaa", "call {i} got foreign bytes");
            assert_eq!(captcha.image, b"GIF89aALPHA;");
        } else {
            assert_eq!(captcha.text, b"bbbbb", "call {i} got foreign bytes");
            assert_eq!(captcha.image, b"GIF89aBRAVO;");
        }
    }
    Ok(())
}

#[tokio::test]
async fn mixed_outcomes_stay_isolated() -> Result<()> {
    let dir = TempDir::new()?;
    let good = fixture_script(&dir, "good", "printf 'abcdeGIF89a;'")?;
    let slow = fixture_script(&dir, "slow", "sleep 2\nprintf 'zzzzzGIF89a;'")?;
    let broken = fixture_script(&dir, "broken", "exit 7")?;

    let good = Arc::new(CaptchaClient::new(Config::new(&good)));
    let slow = Arc::new(CaptchaClient::new(Config::new(&slow)));
    let broken = Arc::new(CaptchaClient::new(Config::new(&broken)));

    let mut calls = JoinSet::new();
    for i in 0..12 {
        match i % 3 {
            0 => {
                let c = Arc::clone(&good);
                calls.spawn(async move { (i, c.get().await) });
            }
            1 => {
                let c = Arc::clone(&slow);
                calls.spawn(async move { (i, c.get_with_timeout(50).await) });
            }
            _ => {
                let c = Arc::clone(&broken);
                calls.spawn(async move { (i, c.get().await) });
            }
        }
    }

    while let Some(joined) = calls.join_next().await {
        let (i, outcome) = joined.expect("facade call panicked");
        match i % 3 {
            0 => {
                let captcha = assert_ok!(outcome);
                assert_eq!(captcha.text, b"abcde");
            }
            1 => {
                let err = outcome.unwrap_err();
                assert!(
                    matches!(err, capfetch::CapfetchError::Timeout(_)),
                    "call {i}: {err:?}"
                );
            }
            _ => {
                let err = outcome.unwrap_err();
                assert!(
                    matches!(err, capfetch::CapfetchError::ProcessExit { code: 7, .. }),
                    "call {i}: {err:?}"
                );
            }
        }
    }
    Ok(())
}
