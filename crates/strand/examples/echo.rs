use std::io::Result;

use tracing::{error, info, level_filters::LevelFilter};

use strand::net::Listener;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .init();

    strand::block_on(async {
        let listener = Listener::bind(("127.0.0.1", 3040)).await?;
        info!(addr = %listener.local_addr(), "Listening");

        while let Ok((mut stream, peer)) = listener.accept().await {
            info!(?peer, "Received connection");

            strand::spawn(async move {
                loop {
                    match stream.read(4096, false).await {
                        Ok(bytes) if bytes.is_empty() => break,
                        Ok(bytes) => {
                            if let Err(err) = stream.write(&bytes).await {
                                error!(?err, "Failed to write to stream");
                                break;
                            }
                        }
                        Err(err) => {
                            error!(?err, "Failed to read from stream");
                            break;
                        }
                    }
                }
            });
        }

        Ok(())
    })
}
