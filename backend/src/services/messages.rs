//! Client-facing response messages.

pub const SUCCESS: &str = "Thành công";

pub const TOKEN_REQUIRED: &str = "Token không được cung cấp";
pub const TOKEN_INVALID: &str = "Token không hợp lệ";
pub const UNAUTHORIZED: &str = "Không được phép truy cập";
pub const FORBIDDEN: &str = "Không có quyền truy cập";

pub const INVALID_DATA: &str = "Dữ liệu không hợp lệ";
pub const INVALID_ID: &str = "ID không hợp lệ";
pub const NOTHING_TO_UPDATE: &str = "Không có trường nào để cập nhật";
pub const REQUIRED_FIELDS: &str = "Các trường bắt buộc không được để trống";
pub const NOT_FOUND: &str = "Không tìm thấy dữ liệu";
pub const CONFLICT: &str = "Dữ liệu đã tồn tại";

pub const INVALID_CREDENTIALS: &str = "Email hoặc mật khẩu không đúng";
pub const ACCOUNT_INACTIVE: &str = "Tài khoản chưa được kích hoạt";
pub const EMAIL_TAKEN: &str = "Email đã được sử dụng";
pub const USER_NOT_FOUND: &str = "Người dùng không tồn tại";
pub const INVALID_ROLE: &str = "Vai trò không hợp lệ";

pub const HOMESTAY_NOT_FOUND: &str = "Homestay không tồn tại";
pub const HOMESTAY_UNAVAILABLE: &str = "Homestay không khả dụng";
pub const ROOM_NOT_FOUND: &str = "Phòng không tồn tại";
pub const AVAILABILITY_NOT_FOUND: &str = "Availability không tồn tại";
pub const AVAILABILITY_EXISTS: &str = "Availability cho ngày này đã tồn tại";
pub const PAST_AVAILABILITY: &str = "Không thể tạo availability cho ngày trong quá khứ";

pub const BOOKING_NOT_FOUND: &str = "Booking không tồn tại";
pub const BOOKING_REQUEST_NOT_FOUND: &str = "Yêu cầu đặt phòng không tồn tại";
pub const BAD_CHECK_IN: &str = "Ngày check-in không hợp lệ";
pub const BAD_CHECK_OUT: &str = "Ngày check-out không hợp lệ";
pub const DATE_ORDER: &str = "Ngày check-in phải trước ngày check-out";
pub const INVALID_ROOM: &str = "Phòng không hợp lệ";
pub const ROOM_TAKEN: &str = "Phòng đã được đặt trong khoảng thời gian này";
pub const BOOKING_WITHOUT_ROOMS: &str = "Booking không có phòng nào";
pub const INVALID_STATUS: &str = "Trạng thái booking không hợp lệ";

pub const REVIEW_FIELDS: &str =
    "Các trường bắt buộc không được để trống và rating phải từ 1 đến 5";
pub const REVIEW_EXISTS: &str = "Booking đã được đánh giá";

pub const DATABASE_ERROR: &str = "Lỗi cơ sở dữ liệu";
pub const UNKNOWN_ENDPOINT: &str = "API endpoint không tồn tại";
