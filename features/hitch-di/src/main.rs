use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use hitch_di::{Component, DynError, Harness, InjectError};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hitch_di=debug")),
        )
        .init();

    let mut harness = Harness::new();
    let provided = harness.provide((
        Component::<Cache>::new()
            .depends_on::<Database>("database")
            .constructor(|deps| -> Result<Cache, InjectError> {
                Ok(Cache {
                    database: deps.get("database")?,
                })
            })
            .on_start(|cache| async move {
                println!("cache warming up from {}", cache.database.url);
                Ok::<_, DynError>(())
            })
            .on_stop_blocking(|_| {
                println!("cache flushed");
                Ok::<_, DynError>(())
            }),
        Component::instance(Database {
            url: "memory://demo".to_string(),
        })
        .on_start(|database| async move {
            println!("database connected to {}", database.url);
            Ok::<_, DynError>(())
        })
        .on_stop_blocking(|_| {
            println!("database disconnected");
            Ok::<_, DynError>(())
        }),
        Component::<Server>::new()
            .depends_on::<Cache>("cache")
            .constructor(|deps| -> Result<Server, InjectError> {
                Ok(Server {
                    cache: deps.get("cache")?,
                    served: AtomicUsize::new(0),
                })
            })
            .on_run(|server| async move {
                let served = server.served.fetch_add(3, Ordering::SeqCst) + 3;
                println!("server handled {served} requests");
                Ok::<_, DynError>(())
            })
            .on_stop_blocking(|_| {
                println!("server closed");
                Ok::<_, DynError>(())
            }),
    ));
    if let Err(e) = provided {
        eprintln!("{e}");
        return;
    }

    println!("{:?}", harness.environment());
    let server = harness.environment().require::<Server>().unwrap();
    println!("server uses {}", server.cache.database.url);

    match harness.run() {
        Ok(outcome) => println!("{outcome:?}"),
        Err(e) => eprintln!("{e}"),
    }
}

struct Database {
    url: String,
}

struct Cache {
    database: Arc<Database>,
}

struct Server {
    cache: Arc<Cache>,
    served: AtomicUsize,
}
