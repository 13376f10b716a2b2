pub mod payment_events_loop;
