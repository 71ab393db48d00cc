use clap::Parser;

#[derive(Parser, Debug)]
#[clap(name = "buspass-server")]
#[clap(version = "0.4.0")]
#[clap(about = "bus pass and ticketing backend with role based dashboards", long_about = None)]
pub struct Args {
    #[clap(long, default_value_t = String::from("127.0.0.1"))]
    pub host: String,

    #[clap(short, long, default_value_t = 8080)]
    pub port: u16,

    #[clap(short, long, action)]
    pub verbose: bool,
}
