//! Wizzeye signaling server executable.

use std::path::PathBuf;

use actix::Actor as _;
use clap::{
    app_from_crate, crate_authors, crate_description, crate_name,
    crate_version, Arg,
};
use failure::Error;

use wizzeye::{
    api::client::server, conf::Conf, log, log::prelude::*,
    signalling::Router,
};

fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();

    let opts = app_from_crate!()
        .arg(
            Arg::with_name("config")
                .help("Path to configuration file.")
                .default_value("config.toml")
                .long("config")
                .short("c"),
        )
        .arg(
            Arg::with_name("webroot")
                .help("Directory with static pages served alongside /ws.")
                .default_value("webroot")
                .long("webroot")
                .short("w"),
        )
        .get_matches();

    let conf = Conf::parse(opts.value_of("config"))?;
    let webroot = PathBuf::from(opts.value_of("webroot").unwrap_or("webroot"));

    let _log_guard = log::init();
    info!("{:?}", conf);

    actix::System::new().block_on(async move {
        let router = Router::new().start();
        server::run(conf, webroot, router).await
    })?;

    Ok(())
}
