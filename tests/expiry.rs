use std::thread;
use std::time::Duration;

use bytes::Bytes;
use listdb::{Db, DbOptions};
use tempfile::TempDir;

fn open_temp() -> anyhow::Result<(TempDir, Db)> {
    let dir = TempDir::new()?;
    let db = Db::open(dir.path(), DbOptions::default())?;
    Ok((dir, db))
}

fn values(items: &[&str]) -> Vec<Bytes> {
    items
        .iter()
        .map(|item| Bytes::copy_from_slice(item.as_bytes()))
        .collect()
}

#[test]
fn expire_then_resurrect() -> anyhow::Result<()> {
    let (_dir, db) = open_temp()?;

    db.rpush(b"e", &values(&["v"]))?;
    db.expire(b"e", 1)?;

    // Expiry has second granularity; 1.5s is past it regardless of phase.
    thread::sleep(Duration::from_millis(1500));

    assert!(db.llen(b"e").unwrap_err().is_not_found());
    assert!(db.lindex(b"e", 0).unwrap_err().is_not_found());
    assert!(db.lpop(b"e").unwrap_err().is_not_found());

    // Pushing resurrects the key under a new version; the old record is an
    // orphan and never observable.
    assert_eq!(db.rpush(b"e", &values(&["w"]))?, 1);
    assert_eq!(db.lrange(b"e", 0, -1)?, values(&["w"]));
    Ok(())
}

#[test]
fn future_expiry_leaves_the_list_readable() -> anyhow::Result<()> {
    let (_dir, db) = open_temp()?;

    db.rpush(b"k", &values(&["a", "b"]))?;
    db.expire(b"k", 1000)?;
    assert_eq!(db.llen(b"k")?, 2);
    assert_eq!(db.lrange(b"k", 0, -1)?, values(&["a", "b"]));
    Ok(())
}

#[test]
fn expire_zero_invalidates_immediately() -> anyhow::Result<()> {
    let (_dir, db) = open_temp()?;

    db.rpush(b"k", &values(&["a", "b"]))?;
    db.expire(b"k", 0)?;

    assert!(db.llen(b"k").unwrap_err().is_not_found());
    assert!(db.lrange(b"k", 0, -1).unwrap_err().is_not_found());

    assert_eq!(db.rpush(b"k", &values(&["c"]))?, 1);
    assert_eq!(db.lrange(b"k", 0, -1)?, values(&["c"]));
    Ok(())
}

#[test]
fn del_invalidates_and_recreates() -> anyhow::Result<()> {
    let (_dir, db) = open_temp()?;

    db.rpush(b"k", &values(&["a", "b"]))?;
    db.del(b"k")?;

    assert!(db.llen(b"k").unwrap_err().is_not_found());
    assert!(db.lpop(b"k").unwrap_err().is_not_found());

    assert_eq!(db.lpush(b"k", &values(&["c"]))?, 1);
    assert_eq!(db.lrange(b"k", 0, -1)?, values(&["c"]));
    Ok(())
}

#[test]
fn expire_and_del_on_missing_keys() -> anyhow::Result<()> {
    let (_dir, db) = open_temp()?;

    assert!(db.expire(b"nope", 10).unwrap_err().is_not_found());
    assert!(db.del(b"nope").unwrap_err().is_not_found());
    Ok(())
}

#[test]
fn expired_list_is_a_fresh_slate_for_rpoplpush_destinations() -> anyhow::Result<()> {
    let (_dir, db) = open_temp()?;

    db.rpush(b"dst", &values(&["old"]))?;
    db.expire(b"dst", 0)?;

    db.rpush(b"src", &values(&["a", "b"]))?;
    assert_eq!(db.rpoplpush(b"src", b"dst")?, Bytes::from_static(b"b"));
    // Only the moved element is visible; the pre-expiry record is orphaned.
    assert_eq!(db.lrange(b"dst", 0, -1)?, values(&["b"]));
    Ok(())
}
