pub mod midtrans_client;
