use std::process::ExitCode;
use std::thread;

use clap::Parser;

use bh_nbody_ring::config::{Args, Config, TransportKind};
use bh_nbody_ring::error::Error;
use bh_nbody_ring::render::{NullRenderer, RasterRenderer, Renderer};
use bh_nbody_ring::transport::thread::ThreadTransport;
use bh_nbody_ring::transport::Transport;
use bh_nbody_ring::{init, Simulator};

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let result = match args.transport {
        TransportKind::Thread => run_thread(&args),
        #[cfg(feature = "mpi-transport")]
        TransportKind::Mpi => run_mpi(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(match e {
                Error::Configuration(_) => 1,
                Error::Messaging(_) => 2,
                Error::Numeric(_) => 3,
            })
        }
    }
}

fn run_thread(args: &Args) -> bh_nbody_ring::Result<()> {
    let config = Config::from_args(args, args.processes)?;
    let transports = ThreadTransport::ring(config.p);

    thread::scope(|scope| {
        let handles: Vec<_> = transports
            .into_iter()
            .map(|transport| {
                let config = config.clone();
                scope.spawn(move || run_rank(&transport, &config))
            })
            .collect();

        for handle in handles {
            handle.join().expect("simulation rank thread panicked")?;
        }
        Ok(())
    })
}

#[cfg(feature = "mpi-transport")]
fn run_mpi(args: &Args) -> bh_nbody_ring::Result<()> {
    use bh_nbody_ring::transport::mpi_backend::MpiTransport;
    use mpi::traits::Communicator;

    let universe = mpi::initialize().expect("MPI environment failed to initialize");
    let transport = MpiTransport::new(universe.world());
    let config = Config::from_args(args, transport.size())?;
    run_rank(&transport, &config)
}

fn run_rank(transport: &dyn Transport, config: &Config) -> bh_nbody_ring::Result<()> {
    let rank = transport.rank();
    let _span = tracing::info_span!("rank", rank).entered();

    let owned = init::generate(config.n, config.p, rank, config.r, config.seed);
    tracing::info!(size = transport.size(), bodies = owned.len(), "rank initialized");

    let mut sim = Simulator::new(transport, owned, config.r, config.dt, config.theta).with_render(config.render);

    if config.render && rank == 0 {
        let mut renderer = RasterRenderer::new(config.output_dir.clone(), 1024, config.r);
        sim.run(config.steps, &mut renderer)
    } else {
        let mut renderer = NullRenderer;
        sim.run(config.steps, &mut renderer)
    }
}
