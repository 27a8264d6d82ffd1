//! Integration tests for rememo

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

mod restart_recovery {
    use super::init_tracing;
    use rememo::{CacheDict, CallContext, KeyPolicy, SingleValueCache};
    use std::cell::Cell;
    use tempfile::TempDir;

    #[test]
    fn single_value_survives_a_restart() {
        init_tracing();
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("counter.json");

        // Each "run" builds its own state, as a restarted process would.
        let run = |path: &std::path::Path| {
            let real_calls = Cell::new(0u64);
            let value: u64 = SingleValueCache::new(path)
                .cached(|| {
                    real_calls.set(real_calls.get() + 1);
                    real_calls.get()
                })
                .unwrap();
            (value, real_calls.get())
        };

        let (first_value, first_calls) = run(&path);
        assert_eq!((first_value, first_calls), (1, 1));

        // Fresh state, same file: the stored result wins over recomputation.
        let (second_value, second_calls) = run(&path);
        assert_eq!(second_value, 1);
        assert_eq!(second_calls, 0);
    }

    #[test]
    fn interrupted_loop_resumes_where_it_stopped() {
        init_tracing();
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("steps.json");
        let computed = Cell::new(0u32);

        let step = |cache: &CacheDict, n: u64| -> u64 {
            let ctx = CallContext::new("step").arg(&n).unwrap();
            cache
                .cached(&ctx, &KeyPolicy::Automatic, || {
                    computed.set(computed.get() + 1);
                    n * 10
                })
                .unwrap()
        };

        // First run crashes after three steps.
        let cache = CacheDict::new(&path);
        for n in 0..3 {
            step(&cache, n);
        }
        assert_eq!(computed.get(), 3);

        // Second run walks all five steps; only the new two compute.
        let cache = CacheDict::new(&path);
        let results: Vec<u64> = (0..5).map(|n| step(&cache, n)).collect();
        assert_eq!(results, vec![0, 10, 20, 30, 40]);
        assert_eq!(computed.get(), 5);
    }
}

mod replay_runs {
    use super::init_tracing;
    use rememo::{Access, CacheDict, CallContext, KeyPolicy, RememoError};
    use tempfile::TempDir;

    #[test]
    fn read_only_replay_serves_hits_and_refuses_new_work() {
        init_tracing();
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("replay.json");

        let recording = CacheDict::new(&path);
        let ctx_known = CallContext::new("f").arg(&1).unwrap();
        recording
            .cached(&ctx_known, &KeyPolicy::Automatic, || "known".to_string())
            .unwrap();

        let replay = CacheDict::with_access(&path, Access::parse("r").unwrap());
        let known: String = replay
            .cached(&ctx_known, &KeyPolicy::Automatic, || unreachable!())
            .unwrap();
        assert_eq!(known, "known");

        let ctx_new = CallContext::new("f").arg(&2).unwrap();
        let err = replay
            .cached::<String, _>(&ctx_new, &KeyPolicy::Automatic, || unreachable!())
            .unwrap_err();
        assert!(matches!(err, RememoError::ExecutionNotPermitted { .. }));
    }

    #[test]
    fn no_write_replay_leaves_the_file_untouched() {
        init_tracing();
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("replay.json");

        let ctx = CallContext::new("f").arg(&1).unwrap();
        CacheDict::new(&path)
            .cached(&ctx, &KeyPolicy::Automatic, || 1u64)
            .unwrap();
        let before = std::fs::read(&path).unwrap();

        let ctx_other = CallContext::new("f").arg(&2).unwrap();
        CacheDict::with_access(&path, Access::parse("re").unwrap())
            .cached(&ctx_other, &KeyPolicy::Automatic, || 2u64)
            .unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), before);
    }
}

mod mixed_usage {
    use super::init_tracing;
    use rememo::{CacheDict, CallContext, KeyPolicy};
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Summary {
        total: f64,
        samples: Vec<u32>,
        label: Option<String>,
    }

    #[test]
    fn scoped_entries_and_decorated_entries_share_one_file() {
        init_tracing();
        let temp = TempDir::new().unwrap();
        let cache = CacheDict::new(temp.path().join("shared.json"));

        cache
            .scope(|session| {
                session.put(
                    "summary",
                    &Summary {
                        total: 0.5,
                        samples: vec![1, 2, 3],
                        label: None,
                    },
                )
            })
            .unwrap();

        let ctx = CallContext::new("derived");
        cache
            .cached(&ctx, &KeyPolicy::outer("derived"), || 99u64)
            .unwrap();

        cache
            .scope(|session| {
                assert_eq!(session.len(), 2);
                let summary: Option<Summary> = session.get("summary")?;
                assert_eq!(
                    summary,
                    Some(Summary {
                        total: 0.5,
                        samples: vec![1, 2, 3],
                        label: None,
                    })
                );
                assert_eq!(session.get::<u64>("derived")?, Some(99));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn structured_values_roundtrip_through_restart() {
        init_tracing();
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("structured.json");

        let expensive = Summary {
            total: 123.456,
            samples: (0..100).collect(),
            label: Some("run-7".to_string()),
        };

        let ctx = CallContext::new("analyze").kwarg("run", &7).unwrap();
        let stored: Summary = CacheDict::new(&path)
            .cached(&ctx, &KeyPolicy::Automatic, || expensive.clone())
            .unwrap();

        let reloaded: Summary = CacheDict::new(&path)
            .cached(&ctx, &KeyPolicy::Automatic, || unreachable!())
            .unwrap();
        assert_eq!(stored, reloaded);
        assert_eq!(reloaded, expensive);
    }
}

mod cache_directory {
    use super::init_tracing;
    use rememo::{set_cache_dir, CacheDict, SingleValueCache};
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn bare_file_names_land_in_the_configured_directory() {
        init_tracing();
        let temp = TempDir::new().unwrap();
        set_cache_dir(temp.path());

        SingleValueCache::new("bare.json").cached(|| 1u64).unwrap();
        assert!(temp.path().join("bare.json").exists());

        let peeked: Option<u64> = SingleValueCache::peek("bare.json").unwrap();
        assert_eq!(peeked, Some(1));
    }

    #[test]
    #[serial]
    fn default_dict_file_is_created_in_the_configured_directory() {
        init_tracing();
        let temp = TempDir::new().unwrap();
        set_cache_dir(temp.path());

        CacheDict::default()
            .scope(|session| session.put("k", &1))
            .unwrap();
        assert!(temp.path().join(rememo::DEFAULT_DICT_FILE_NAME).exists());
    }
}
