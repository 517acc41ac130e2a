pub mod bank;
pub mod bill;
pub mod booking;
pub mod customer;
pub mod expense;
pub mod property;
pub mod revenue;
pub mod user;

pub use bank::{BankAccount, BankTransaction, CreateBankAccount, TxnDirection};
pub use bill::Bill;
pub use booking::{
    BillingType, Booking, BookingStatus, BookingType, BulkDeleteBookings, BulkDeleteResult,
    CancelBooking, ConfirmBooking, CreateBooking, Financials, OccupancyType, PaymentMode,
};
pub use customer::{CreateCustomerMaster, CustomerMaster};
pub use expense::{Expense, ExpenseForm};
pub use property::{CreateProperty, Property};
pub use revenue::{CreatePropertyRevenue, PropertyRevenue};
pub use user::{
    AccountType, CreateCaretaker, LoginRequest, LoginResponse, RefreshRequest, RegisterRequest,
    UpdateProfile, UpdateUser, User, UserResponse,
};
