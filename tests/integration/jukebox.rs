//! The registry with real per-guild worker tasks behind it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use jukebox::commands::music::utils::dispatcher::{CommandRequest, Jukebox, MusicCommand};
use jukebox::commands::music::utils::music_manager::MusicError;
use jukebox::commands::music::utils::responses::{NoticeKind, Reply};
use pretty_assertions::assert_eq;
use tokio::time::timeout;

use crate::common::fixtures::{
    guild, neighbour, other_guild, play, request, stream_url, voice_channel,
};
use crate::common::init;
use crate::common::mocks::{CrashingResolver, FakeTransport, SlowResolver, working_resolver};

const WAIT: Duration = Duration::from_secs(2);

async fn wait_for_join(transport: &FakeTransport, joins: usize) {
    timeout(WAIT, async {
        while transport.joins().len() < joins {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("worker never joined voice");
}

#[tokio::test]
async fn test_dispatch_plays_then_queues() {
    init();
    let transport = Arc::new(FakeTransport::new());
    let (jukebox, _notices) = Jukebox::new(
        Arc::new(working_resolver()),
        transport.clone(),
        Some(WAIT),
    );

    assert_eq!(
        jukebox.dispatch(guild(), request(play("song1"))).await,
        Ok(Reply::NowPlaying {
            title: "Title of song1".into()
        })
    );
    assert_matches!(
        jukebox.dispatch(guild(), request(play("song2"))).await,
        Ok(Reply::Queued { position: 1, .. })
    );
    assert_eq!(jukebox.queues().len(guild()), 1);
}

#[tokio::test]
async fn test_track_end_announces_next_track() {
    init();
    let transport = Arc::new(FakeTransport::new());
    let (jukebox, mut notices) = Jukebox::new(
        Arc::new(working_resolver()),
        transport.clone(),
        Some(WAIT),
    );
    jukebox.dispatch(guild(), request(play("song1"))).await.unwrap();
    jukebox.dispatch(guild(), request(play("song2"))).await.unwrap();

    assert!(transport.finish_current(guild()));

    let notice = timeout(WAIT, notices.recv())
        .await
        .expect("no notice before timeout")
        .expect("notice channel closed");
    assert_eq!(
        notice.kind,
        NoticeKind::NowPlaying {
            title: "Title of song2".into()
        }
    );
    assert_eq!(
        transport.streamed(),
        vec![stream_url("song1"), stream_url("song2")]
    );
    assert!(jukebox.queues().is_empty(guild()));
}

#[tokio::test]
async fn test_slow_guild_does_not_block_others() {
    init();
    let transport = Arc::new(FakeTransport::new());
    let (jukebox, _notices) = Jukebox::new(
        Arc::new(SlowResolver {
            delay: Duration::from_secs(60),
        }),
        transport.clone(),
        None,
    );
    let jukebox = Arc::new(jukebox);

    let stuck = {
        let jukebox = jukebox.clone();
        tokio::spawn(async move { jukebox.dispatch(guild(), request(play("slow song"))).await })
    };
    wait_for_join(&transport, 1).await;

    let reply = timeout(WAIT, jukebox.dispatch(other_guild(), request(play("quick"))))
        .await
        .expect("other guild was blocked");
    assert_matches!(reply, Ok(Reply::NowPlaying { .. }));
    assert!(!stuck.is_finished());

    stuck.abort();
}

#[tokio::test]
async fn test_concurrent_plays_in_one_guild_are_serialized() {
    init();
    let transport = Arc::new(FakeTransport::new());
    let (jukebox, _notices) = Jukebox::new(
        Arc::new(SlowResolver {
            delay: Duration::from_millis(200),
        }),
        transport.clone(),
        Some(WAIT),
    );
    let jukebox = Arc::new(jukebox);

    let first = {
        let jukebox = jukebox.clone();
        tokio::spawn(async move { jukebox.dispatch(guild(), request(play("slow song"))).await })
    };
    // The first request is mid-resolution once the worker has joined
    wait_for_join(&transport, 1).await;

    let second = jukebox.dispatch(guild(), request(play("next song"))).await;

    assert_matches!(first.await.unwrap(), Ok(Reply::NowPlaying { .. }));
    assert_matches!(second, Ok(Reply::Queued { position: 1, .. }));
    assert_eq!(transport.joins(), vec![(guild(), voice_channel())]);
    assert_eq!(transport.streamed(), vec![stream_url("slow song")]);
}

#[tokio::test]
async fn test_voice_disconnect_resets_guild() {
    init();
    let transport = Arc::new(FakeTransport::new());
    let (jukebox, _notices) = Jukebox::new(
        Arc::new(working_resolver()),
        transport.clone(),
        Some(WAIT),
    );
    jukebox.dispatch(guild(), request(play("song1"))).await.unwrap();
    jukebox.dispatch(guild(), request(play("song2"))).await.unwrap();

    jukebox.voice_disconnected(guild(), Some(voice_channel()));

    assert_eq!(
        jukebox.dispatch(guild(), request(MusicCommand::Queue)).await,
        Err(MusicError::QueueEmpty)
    );
    assert_eq!(
        jukebox.dispatch(guild(), request(MusicCommand::Stop)).await,
        Err(MusicError::NoActiveConnection)
    );
}

#[tokio::test]
async fn test_voice_disconnect_for_unknown_guild_is_ignored() {
    init();
    let (jukebox, _notices) = Jukebox::new(
        Arc::new(working_resolver()),
        Arc::new(FakeTransport::new()),
        Some(WAIT),
    );

    jukebox.voice_disconnected(other_guild(), None);

    assert_eq!(
        jukebox.dispatch(other_guild(), request(MusicCommand::Skip)).await,
        Err(MusicError::NothingPlaying)
    );
}

#[tokio::test]
async fn test_stop_waits_behind_inflight_resolve() {
    init();
    let delay = Duration::from_millis(300);
    let transport = Arc::new(FakeTransport::new());
    let (jukebox, _notices) = Jukebox::new(
        Arc::new(SlowResolver { delay }),
        transport.clone(),
        Some(WAIT),
    );
    let jukebox = Arc::new(jukebox);

    let started = Instant::now();
    let first = {
        let jukebox = jukebox.clone();
        tokio::spawn(async move { jukebox.dispatch(guild(), request(play("slow song"))).await })
    };
    wait_for_join(&transport, 1).await;

    let stop = jukebox.dispatch(guild(), request(MusicCommand::Stop)).await;

    // The reply only comes once the resolve is done, so callers must acknowledge early
    assert!(started.elapsed() >= delay - Duration::from_millis(50));
    assert_eq!(stop, Ok(Reply::Stopped));
    assert_matches!(first.await.unwrap(), Ok(Reply::NowPlaying { .. }));
    assert_eq!(transport.leaves(), vec![guild()]);
}

#[tokio::test]
async fn test_dead_worker_is_restarted() {
    init();
    let (jukebox, _notices) = Jukebox::new(
        Arc::new(CrashingResolver),
        Arc::new(FakeTransport::new()),
        Some(WAIT),
    );

    assert_eq!(
        jukebox.dispatch(guild(), request(play("crash"))).await,
        Err(MusicError::PlayerUnavailable)
    );

    let reply = timeout(WAIT, jukebox.dispatch(guild(), request(play("song1"))))
        .await
        .expect("restarted worker never answered");
    assert_matches!(reply, Ok(Reply::NowPlaying { .. }));
}

#[tokio::test]
async fn test_voice_move_updates_channel_check() {
    init();
    let (jukebox, _notices) = Jukebox::new(
        Arc::new(working_resolver()),
        Arc::new(FakeTransport::new()),
        Some(WAIT),
    );
    jukebox.dispatch(guild(), request(play("song1"))).await.unwrap();

    jukebox.voice_moved(guild(), crate::common::fixtures::other_voice_channel());

    let from_new_channel = CommandRequest {
        command: play("song2"),
        invoker: neighbour(),
    };
    assert_matches!(
        jukebox.dispatch(guild(), from_new_channel).await,
        Ok(Reply::Queued { position: 1, .. })
    );
    assert_eq!(
        jukebox.dispatch(guild(), request(play("song3"))).await,
        Err(MusicError::ChannelConflict)
    );
}
