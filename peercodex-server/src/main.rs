use peercodex_common::db::create_db_thread_pool;
use peercodex_common::email::senders::{MockSender, SmtpSender};
use peercodex_common::email::SendEmail;

use actix_web::web::Data;
use actix_web::{App, HttpServer};
use flexi_logger::{
    Age, Cleanup, Criterion, Duplicate, FileSpec, LogSpecification, Logger, Naming, WriteMode,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

mod env;
mod handlers;
mod middleware;
mod services;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let bind_addr = match parse_bind_addr(std::env::args().skip(1)) {
        Ok(addr) => addr,
        Err(msg) => {
            eprintln!("ERROR: {msg}");
            std::process::exit(1);
        }
    };

    let log_spec = match LogSpecification::parse(&env::CONF.log_level) {
        Ok(s) => s,
        Err(_) => {
            eprintln!("ERROR: Invalid log level: {}", &env::CONF.log_level);
            std::process::exit(1);
        }
    };

    let _logger = Logger::with(log_spec)
        .log_to_file(FileSpec::default().directory("./logs").basename("server"))
        .rotate(
            Criterion::Age(Age::Day),
            Naming::Timestamps,
            Cleanup::KeepLogAndCompressedFiles(60, 365),
        )
        .cleanup_in_background_thread(true)
        .duplicate_to_stdout(Duplicate::All)
        .write_mode(WriteMode::Async)
        .format(|writer, now, record| {
            write!(
                writer,
                "{:5} | {} | {}:{} | {}",
                record.level(),
                now.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
                record.module_path().unwrap_or("<unknown>"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .use_utc()
        .start()
        .expect("Failed to start logger");

    let actix_workers = env::CONF.actix_worker_count;

    // To prevent resource starvation, max connections must be at least as large as the number of
    // actix workers
    let db_max_connections = env::CONF.db_max_connections.max(actix_workers as u32);

    log::info!("Connecting to database...");

    let db_thread_pool = create_db_thread_pool(
        &format!(
            "postgres://{}:{}@{}:{}/{}",
            env::CONF.db_username,
            env::CONF.db_password,
            env::CONF.db_hostname,
            env::CONF.db_port,
            env::CONF.db_name,
        ),
        db_max_connections,
        env::CONF.db_idle_timeout,
    );

    log::info!("Successfully connected to database");

    let smtp_thread_pool: Box<dyn SendEmail> = if env::CONF.email_enabled {
        log::info!("Connecting to SMTP relay...");

        let smtp_thread_pool = SmtpSender::with_credentials(
            &env::CONF.smtp_username,
            &env::CONF.smtp_password,
            &env::CONF.smtp_address,
            env::CONF.smtp_port,
            env::CONF.max_smtp_connections,
            env::CONF.smtp_idle_timeout,
            env::CONF.email_from_address.clone(),
            env::CONF.email_reply_to_address.clone(),
        )
        .expect("Failed to connect to SMTP relay");

        match smtp_thread_pool.test_connection().await {
            Ok(true) => (),
            Ok(false) => panic!("Failed to connect to SMTP relay"),
            Err(e) => panic!("Failed to connect to SMTP relay: {e}"),
        }

        log::info!("Successfully connected to SMTP relay");

        Box::new(smtp_thread_pool)
    } else {
        log::info!("Emails are disabled. Using mock SMTP thread pool.");
        Box::new(MockSender::new())
    };

    let smtp_thread_pool = Arc::new(smtp_thread_pool);
    let route_limiters = services::api::RouteLimiters::default();

    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(db_thread_pool.clone()))
            .app_data(Data::from(Arc::clone(&smtp_thread_pool)))
            .configure(|cfg| services::api::configure(cfg, route_limiters.clone()))
            .wrap(actix_web::middleware::Logger::default())
    })
    .workers(actix_workers)
    .bind(&bind_addr)?
    .run()
    .await?;

    // All worker threads have been joined by this point
    unsafe {
        env::CONF.zeroize();
    }

    Ok(())
}

/// Reads `--host <ip>` and `--port <port>`. Defaults to 127.0.0.1:9000.
fn parse_bind_addr(mut args: impl Iterator<Item = String>) -> Result<String, String> {
    let mut host = IpAddr::V4(Ipv4Addr::LOCALHOST);
    let mut port = 9000u16;

    while let Some(arg) = args.next() {
        match arg.to_lowercase().as_str() {
            "--port" => {
                let value = args
                    .next()
                    .ok_or("--port option specified but no port was given")?;
                port = value
                    .parse()
                    .map_err(|_| format!("Incorrect format for port '{value}'. Integer expected"))?;
            }
            "--host" => {
                let value = args
                    .next()
                    .ok_or("--host option specified but no address was given")?;
                host = value
                    .parse()
                    .map_err(|_| format!("Invalid host address '{value}'"))?;
            }
            a => return Err(format!("Invalid argument: {a}")),
        }
    }

    Ok(SocketAddr::new(host, port).to_string())
}
