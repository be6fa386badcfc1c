//! 解码器 trait 定义.

use yin_core::YinResult;

use crate::frame::SampleBuffer;
use crate::options::DecoderOptions;
use crate::packet::Packet;

/// 解码器 trait
///
/// 解码流程:
/// 1. 调用 `send_packet()` 依次送入三个头包和音频包
/// 2. 调用 `receive_frame()` 取出解码后的采样缓冲区
/// 3. 重复以上步骤直到所有数据处理完毕
/// 4. 送入空包表示输入结束, 之后 `receive_frame()` 取完缓存后返回 `Eof`
pub trait Decoder: Send {
    /// 获取解码器名称
    fn name(&self) -> &str;

    /// 使用配置初始化解码器
    ///
    /// 默认实现为空操作.
    fn open(&mut self, _options: &DecoderOptions) -> YinResult<()> {
        Ok(())
    }

    /// 送入一个数据包
    ///
    /// # 返回
    /// - `Ok(())`: 数据包已接受
    /// - `Err(e)` 且 `e.is_recoverable()`: 该包被丢弃, 解码器仍可继续使用
    fn send_packet(&mut self, packet: &Packet) -> YinResult<()>;

    /// 取出一个采样缓冲区
    ///
    /// # 返回
    /// - `Ok(buffer)`: 成功取出
    /// - `Err(YinError::NeedMoreData)`: 需要送入更多数据包
    /// - `Err(YinError::Eof)`: 所有数据已取出
    fn receive_frame(&mut self) -> YinResult<SampleBuffer>;

    /// 刷新解码器, 清空内部状态
    ///
    /// 用于 seek 后重置重叠缓冲区, 头包配置保持不变.
    fn flush(&mut self);
}
