mod end_of_stream;
mod random;
mod scenario;
